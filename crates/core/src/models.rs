use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_CHUNK_SIZE: usize = 800;
pub const DEFAULT_CHUNK_OVERLAP: usize = 300;

/// A PDF discovered under the root, with the curriculum position inferred
/// from its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub absolute_path: PathBuf,
    /// Relative to the root, always with forward slashes.
    pub relative_path: String,
    pub niveau: String,
    pub matiere: String,
    pub cours: String,
}

impl SourceDocument {
    /// Index name used in the retrieval store: `niveau__matiere__cours`.
    pub fn index_name(&self) -> String {
        format!("{}__{}__{}", self.niveau, self.matiere, self.cours)
    }

    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: self.relative_path.clone(),
            niveau: self.niveau.clone(),
            matiere: self.matiere.clone(),
            cours: self.cours.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    pub niveau: String,
    pub matiere: String,
    pub cours: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// 1-based.
    pub page_number: u32,
    pub raw_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_id: String,
    pub text: String,
    pub page_number: u32,
    /// Position within the page's chunk sequence, starting at 0.
    pub ordinal: u32,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStage {
    Extracting,
    Chunking,
    Ingesting,
}

impl fmt::Display for FileStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStage::Extracting => "extracting",
            FileStage::Chunking => "chunking",
            FileStage::Ingesting => "ingesting",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Indexed { index_id: String },
    DryRun,
    Failed { stage: FileStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    pub relative_path: String,
    pub outcome: FileOutcome,
    pub chunk_count: usize,
}

impl FileReport {
    pub fn index_id(&self) -> Option<&str> {
        match &self.outcome {
            FileOutcome::Indexed { index_id } => Some(index_id.as_str()),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, FileOutcome::Failed { .. })
    }
}

impl fmt::Display for FileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            FileOutcome::Indexed { index_id } => {
                write!(f, "✔ {} => {}", self.relative_path, index_id)
            }
            FileOutcome::DryRun => write!(f, "• {} => dry run", self.relative_path),
            FileOutcome::Failed { error, .. } => {
                write!(f, "✗ {} => {}", self.relative_path, error)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub root: PathBuf,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn new(root: PathBuf, dry_run: bool) -> Self {
        Self {
            root,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            files: Vec::new(),
        }
    }

    /// Entries are only ever appended.
    pub fn record(&mut self, report: FileReport) {
        self.files.push(report);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|file| file.index_id().is_some()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.iter().filter(|file| file.is_failure()).count()
    }

    pub fn total_chunks(&self) -> usize {
        self.files.iter().map(|file| file.chunk_count).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub dry_run: bool,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            dry_run: false,
        }
    }
}
