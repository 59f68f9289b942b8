use chrono::Utc;
use clap::Parser;
use lecture_ingest_core::{
    BatchOrchestrator, HttpIndexStore, IndexIngestor, IngestionOptions, LopdfExtractor,
    MemoryIndexStore, RunSummary, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lecture-ingest", version)]
struct Cli {
    /// Root folder laid out as <niveau>/[<matiere>/]*.pdf
    #[arg(default_value = "PDFs")]
    root: PathBuf,

    /// Only list discovered files and their inferred metadata.
    #[arg(long = "dry", default_value_t = false)]
    dry_run: bool,

    /// Maximum chunk length in characters.
    #[arg(long, env = "CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Characters repeated from one chunk at the start of the next.
    #[arg(long, env = "CHUNK_OVERLAP", default_value_t = DEFAULT_CHUNK_OVERLAP)]
    chunk_overlap: usize,

    /// Index service base URL. Chunks stay in memory when unset.
    #[arg(long, env = "INDEX_SERVICE_URL")]
    index_url: Option<String>,

    /// Bearer token for the index service.
    #[arg(long, env = "INDEX_SERVICE_API_KEY", hide_env_values = true)]
    index_api_key: Option<String>,

    /// Write the run summary as JSON to this path.
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

async fn run_with<I>(
    ingestor: I,
    root: &Path,
    options: IngestionOptions,
) -> anyhow::Result<RunSummary>
where
    I: IndexIngestor + Send + Sync,
{
    let orchestrator = BatchOrchestrator::new(LopdfExtractor, ingestor, options);
    Ok(orchestrator.run(root).await?)
}

fn print_summary(summary: &RunSummary) {
    println!();
    for file in &summary.files {
        println!("{file}");
    }
    println!(
        "{} file(s): {} indexed, {} failed, {} chunk(s)",
        summary.files.len(),
        summary.succeeded(),
        summary.failed(),
        summary.total_chunks()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        root = %cli.root.display(),
        "lecture-ingest boot"
    );

    let options = IngestionOptions {
        chunk_size: cli.chunk_size,
        chunk_overlap: cli.chunk_overlap,
        dry_run: cli.dry_run,
    };

    let summary = match &cli.index_url {
        Some(url) => {
            let store = HttpIndexStore::new(url, cli.index_api_key.clone())?;
            run_with(store, &cli.root, options).await?
        }
        None => {
            if !cli.dry_run {
                warn!("INDEX_SERVICE_URL not set, chunks are kept in memory for this run only");
            }
            run_with(MemoryIndexStore::new(), &cli.root, options).await?
        }
    };

    print_summary(&summary);

    if let Some(path) = &cli.summary_json {
        tokio::fs::write(path, serde_json::to_vec_pretty(&summary)?).await?;
        info!(path = %path.display(), "summary written");
    }

    Ok(())
}
