use crate::chunking::{build_page_chunks, ChunkingConfig};
use crate::error::Result;
use crate::extractor::PdfExtractor;
use crate::ingest::discover_documents;
use crate::normalize::normalize_text;
use crate::traits::IndexIngestor;
use crate::{
    Chunk, FileOutcome, FileReport, FileStage, IngestError, IngestionOptions, RunSummary,
    SourceDocument,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct StageFailure {
    stage: FileStage,
    error: IngestError,
}

trait AtStage<T> {
    fn at(self, stage: FileStage) -> Result<T, StageFailure>;
}

impl<T, E: Into<IngestError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: FileStage) -> Result<T, StageFailure> {
        self.map_err(|error| StageFailure {
            stage,
            error: error.into(),
        })
    }
}

/// Drives discovery, extraction, chunking and ingestion over a whole tree,
/// one file at a time. PDF parsing runs on tokio's blocking pool.
pub struct BatchOrchestrator<X, I>
where
    X: PdfExtractor,
    I: IndexIngestor,
{
    extractor: Arc<X>,
    ingestor: I,
    options: IngestionOptions,
}

impl<X, I> BatchOrchestrator<X, I>
where
    X: PdfExtractor + Send + Sync + 'static,
    I: IndexIngestor + Send + Sync,
{
    pub fn new(extractor: X, ingestor: I, options: IngestionOptions) -> Self {
        Self {
            extractor: Arc::new(extractor),
            ingestor,
            options,
        }
    }

    pub fn ingestor(&self) -> &I {
        &self.ingestor
    }

    /// Processes every PDF under `root`.
    ///
    /// Only a missing root or an invalid chunking configuration fail the run;
    /// anything that goes wrong with a single file is recorded in the summary
    /// and the run moves on.
    pub async fn run(&self, root: &Path) -> Result<RunSummary> {
        let config = ChunkingConfig::from(self.options);
        config.validate()?;

        let documents = discover_documents(root)?;
        let mut summary = RunSummary::new(root.to_path_buf(), self.options.dry_run);
        info!(
            root = %root.display(),
            files = documents.len(),
            dry_run = self.options.dry_run,
            "starting run"
        );

        for document in &documents {
            info!(
                source = %document.relative_path,
                niveau = %document.niveau,
                matiere = %document.matiere,
                cours = %document.cours,
                "processing pdf"
            );

            if self.options.dry_run {
                summary.record(FileReport {
                    relative_path: document.relative_path.clone(),
                    outcome: FileOutcome::DryRun,
                    chunk_count: 0,
                });
                continue;
            }

            let report = match self.process(document, config).await {
                Ok((index_id, chunk_count)) => FileReport {
                    relative_path: document.relative_path.clone(),
                    outcome: FileOutcome::Indexed { index_id },
                    chunk_count,
                },
                Err(failure) => {
                    warn!(
                        source = %document.relative_path,
                        stage = %failure.stage,
                        error = %failure.error,
                        "pdf failed"
                    );
                    FileReport {
                        relative_path: document.relative_path.clone(),
                        outcome: FileOutcome::Failed {
                            stage: failure.stage,
                            error: failure.error.to_string(),
                        },
                        chunk_count: 0,
                    }
                }
            };
            summary.record(report);
        }

        summary.finish();
        info!(
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            chunks = summary.total_chunks(),
            "run completed"
        );
        Ok(summary)
    }

    async fn process(
        &self,
        document: &SourceDocument,
        config: ChunkingConfig,
    ) -> Result<(String, usize), StageFailure> {
        debug!(source = %document.relative_path, "extracting");
        let bytes = tokio::fs::read(&document.absolute_path)
            .await
            .at(FileStage::Extracting)?;
        let extractor = Arc::clone(&self.extractor);
        let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&bytes))
            .await
            .at(FileStage::Extracting)?
            .at(FileStage::Extracting)?;

        debug!(source = %document.relative_path, pages = pages.len(), "normalizing");
        let normalized = pages
            .iter()
            .map(|page| (page.page_number, normalize_text(&page.raw_text)))
            .collect::<Vec<_>>();

        debug!(source = %document.relative_path, "chunking");
        let metadata = document.metadata();
        let mut chunks: Vec<Chunk> = Vec::new();
        for (page_number, text) in &normalized {
            let page_chunks = build_page_chunks(document, &metadata, *page_number, text, config)
                .at(FileStage::Chunking)?;
            chunks.extend(page_chunks);
        }

        debug!(source = %document.relative_path, chunks = chunks.len(), "ingesting");
        let index_id = self
            .ingestor
            .create_or_get_index(&document.index_name())
            .await
            .at(FileStage::Ingesting)?;

        if chunks.is_empty() {
            warn!(source = %document.relative_path, "no text extracted, index left empty");
        } else {
            self.ingestor
                .add_chunks(&index_id, &chunks)
                .await
                .at(FileStage::Ingesting)?;
        }

        Ok((index_id, chunks.len()))
    }
}
