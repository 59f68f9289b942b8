pub mod chunking;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod stores;
pub mod traits;

pub use chunking::{build_page_chunks, split_text, ChunkingConfig, SEPARATORS};
pub use error::{IndexError, IngestError};
pub use extractor::{extract_page_texts, LopdfExtractor, PdfExtractor};
pub use ingest::{discover_documents, discover_pdf_files, parse_metadata};
pub use models::{
    Chunk, ChunkMetadata, ExtractedPage, FileOutcome, FileReport, FileStage, IngestionOptions,
    RunSummary, SourceDocument, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE,
};
pub use normalize::normalize_text;
pub use orchestrator::BatchOrchestrator;
pub use stores::{HttpIndexStore, MemoryIndexStore};
pub use traits::IndexIngestor;
