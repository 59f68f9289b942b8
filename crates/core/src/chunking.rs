use crate::error::{IngestError, Result};
use crate::models::{Chunk, ChunkMetadata, IngestionOptions, SourceDocument};
use sha2::{Digest, Sha256};

/// Separators tried in priority order: paragraph, line, sentence, word.
pub const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be positive".to_string(),
            ));
        }
        if self.overlap >= self.chunk_size {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap {} must be smaller than chunk size {}",
                self.overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    /// Packing target for a segment. Leaves room for the overlap prefix and
    /// its joining space, but never drops below half the chunk size so a
    /// large overlap cannot shred words.
    fn segment_budget(&self) -> usize {
        if self.overlap == 0 {
            self.chunk_size
        } else {
            self.chunk_size
                .saturating_sub(self.overlap + 1)
                .max(self.chunk_size / 2)
                .max(1)
        }
    }
}

impl From<IngestionOptions> for ChunkingConfig {
    fn from(value: IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            overlap: value.chunk_overlap,
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn tail_chars(text: &str, count: usize) -> &str {
    let skip = char_len(text).saturating_sub(count);
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => "",
    }
}

/// Splits `text` into trimmed, non-empty chunks of at most `chunk_size`
/// characters.
///
/// Text that fits is returned as a single chunk. Longer text is cut on the
/// highest-priority separator it contains and the parts are packed greedily;
/// parts that are still too long are cut again on the next separator. Each
/// chunk after the first is prefixed with the last `overlap` characters of its
/// predecessor plus a space, shortened when the full prefix would not fit
/// within `chunk_size`. Text with no separator at all is cut into fixed
/// windows of `chunk_size` that advance by `chunk_size - overlap`.
pub fn split_text(text: &str, config: ChunkingConfig) -> Result<Vec<String>> {
    config.validate()?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if char_len(trimmed) <= config.chunk_size {
        return Ok(vec![trimmed.to_string()]);
    }

    if !SEPARATORS.iter().any(|separator| trimmed.contains(separator)) {
        return Ok(sliding_windows(
            trimmed,
            config.chunk_size,
            config.chunk_size - config.overlap,
        ));
    }

    let mut segments = Vec::new();
    pack_segments(trimmed, &SEPARATORS, config.segment_budget(), &mut segments);

    Ok(apply_overlap(segments, config))
}

fn pack_segments(text: &str, separators: &[&str], budget: usize, out: &mut Vec<String>) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    if char_len(text) <= budget {
        out.push(text.to_string());
        return;
    }

    let Some(position) = separators
        .iter()
        .position(|separator| text.contains(separator))
    else {
        out.extend(sliding_windows(text, budget, budget));
        return;
    };

    let separator = separators[position];
    let remaining = &separators[position + 1..];
    let joins_with_space = separator == " ";

    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    let parts = text.split(separator).collect::<Vec<_>>();
    let last = parts.len() - 1;

    for (index, part) in parts.into_iter().enumerate() {
        let keeps_separator = !joins_with_space && index < last;
        let piece_len = if !keeps_separator {
            char_len(part)
        } else {
            char_len(part) + char_len(separator)
        };
        let joiner_len = usize::from(joins_with_space && !buffer.is_empty());

        if !buffer.is_empty() && buffer_len + joiner_len + piece_len > budget {
            pack_segments(&buffer, remaining, budget, out);
            buffer.clear();
            buffer_len = 0;
        }

        if joins_with_space {
            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_len += 1;
            }
            buffer.push_str(part);
        } else {
            buffer.push_str(part);
            if keeps_separator {
                buffer.push_str(separator);
            }
        }
        buffer_len += piece_len;
    }

    pack_segments(&buffer, remaining, budget, out);
}

fn apply_overlap(segments: Vec<String>, config: ChunkingConfig) -> Vec<String> {
    if config.overlap == 0 {
        return segments;
    }

    let mut chunks: Vec<String> = Vec::with_capacity(segments.len());
    for segment in segments {
        let prefixed = chunks.last().and_then(|previous| {
            if char_len(previous) <= config.overlap {
                return None;
            }
            let room = config
                .chunk_size
                .saturating_sub(char_len(&segment) + 1)
                .min(config.overlap);
            (room > 0).then(|| format!("{} {}", tail_chars(previous, room), segment))
        });
        chunks.push(prefixed.unwrap_or(segment));
    }
    chunks
}

fn sliding_windows(text: &str, window: usize, step: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = step.max(1);
    let mut windows = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + window).min(chars.len());
        let piece: String = chars[start..end].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            windows.push(piece.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }

    windows
}

/// Chunks one normalized page and tags every chunk with the document metadata.
pub fn build_page_chunks(
    document: &SourceDocument,
    metadata: &ChunkMetadata,
    page_number: u32,
    normalized: &str,
    config: ChunkingConfig,
) -> Result<Vec<Chunk>> {
    let index_name = document.index_name();

    let chunks = split_text(normalized, config)?
        .into_iter()
        .enumerate()
        .map(|(ordinal, text)| {
            let ordinal = ordinal as u32;
            Chunk {
                chunk_id: make_chunk_id(&index_name, page_number, ordinal, &text),
                text,
                page_number,
                ordinal,
                metadata: metadata.clone(),
            }
        })
        .collect();

    Ok(chunks)
}

fn make_chunk_id(index_name: &str, page: u32, ordinal: u32, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(index_name.as_bytes());
    hasher.update(page.to_le_bytes());
    hasher.update(ordinal.to_le_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(chunk_size: usize, overlap: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size,
            overlap,
        }
    }

    fn paragraph(seed: &str, len: usize) -> String {
        let mut text = String::new();
        while text.len() < len {
            text.push_str(seed);
            text.push(' ');
        }
        text.truncate(len);
        text.trim_end().to_string()
    }

    #[test]
    fn short_text_is_returned_trimmed() {
        let chunks = split_text("  Le coeur a quatre cavités.  ", config(800, 300)).unwrap();
        assert_eq!(chunks, vec!["Le coeur a quatre cavités.".to_string()]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(split_text("", config(800, 300)).unwrap().is_empty());
        assert!(split_text(" \n\n \t ", config(10, 2)).unwrap().is_empty());
        assert!(split_text(&" ".repeat(50), config(10, 2)).unwrap().is_empty());
    }

    #[test]
    fn overlap_not_below_chunk_size_is_rejected() {
        let result = split_text("anything", config(100, 100));
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));

        let result = split_text("anything", config(100, 250));
        assert!(matches!(result, Err(IngestError::InvalidChunkConfig(_))));

        assert!(ChunkingConfig::new(0, 0).is_err());
        assert!(ChunkingConfig::new(800, 300).is_ok());
    }

    #[test]
    fn three_paragraphs_become_three_overlapping_chunks() {
        let paragraphs = [
            paragraph("anatomie du coeur", 640),
            paragraph("physiologie cardiaque", 640),
            paragraph("pharmacologie clinique", 640),
        ];
        let text = paragraphs.join("\n\n");
        let chunks = split_text(&text, config(800, 150)).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], paragraphs[0]);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 800);
        }
        for pair in chunks.windows(2) {
            let expected = format!("{} ", tail_chars(&pair[0], 150));
            assert!(pair[1].starts_with(&expected));
        }
        assert!(chunks[2].ends_with(paragraphs[2].as_str()));
    }

    #[test]
    fn separator_chunks_never_exceed_chunk_size() {
        let sentence = "La fibrillation auriculaire est une arythmie fréquente. ";
        let text = sentence.repeat(60);
        let chunks = split_text(&text, config(200, 50)).unwrap();

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 200, "chunk too long: {chunk}");
            assert!(!chunk.trim().is_empty());
        }
    }

    #[test]
    fn default_sized_overlap_is_carried_in_full() {
        let sentence = "La fibrillation auriculaire est une arythmie fréquente. ";
        let text = sentence.repeat(60);
        let chunks = split_text(&text, config(800, 300)).unwrap();

        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert!(pair[0].chars().count() > 300);
            let expected = format!("{} ", tail_chars(&pair[0], 300));
            assert!(pair[1].starts_with(&expected));
            assert!(pair[1].chars().count() <= 800);
        }
    }

    #[test]
    fn overlap_just_below_chunk_size_keeps_words_whole() {
        let text = "alpha beta gamma. ".repeat(40);
        for overlap in [98, 99] {
            let chunks = split_text(&text, config(100, overlap)).unwrap();

            assert_eq!(chunks.len(), 20);
            for chunk in &chunks {
                assert!(chunk.chars().count() <= 100);
                assert!(chunk
                    .split_whitespace()
                    .all(|word| ["alpha", "beta", "gamma", "gamma."].contains(&word)));
            }
            assert_eq!(chunks[0], "alpha beta gamma. alpha beta gamma.");
        }
    }

    #[test]
    fn final_sentence_does_not_gain_a_second_period() {
        let text = "Le rein filtre le sang. ".repeat(10);
        let chunks = split_text(&text, config(60, 0)).unwrap();

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| !chunk.contains("..")));
        assert!(chunks.last().unwrap().ends_with("sang."));
    }

    #[test]
    fn oversized_paragraph_falls_through_to_lower_separators() {
        let long_paragraph = "mot ".repeat(100);
        let text = format!("Intro courte.\n\n{}", long_paragraph.trim_end());
        let chunks = split_text(&text, config(60, 10)).unwrap();

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 60);
        }
    }

    #[test]
    fn unbroken_token_uses_fixed_windows() {
        let token = "x".repeat(250);
        let chunks = split_text(&token, config(100, 20)).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 100);
        assert_eq!(chunks[1].len(), 100);
        assert_eq!(chunks[2].len(), 90);
    }

    #[test]
    fn zero_overlap_leaves_segments_untouched() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let chunks = split_text(text, config(12, 0)).unwrap();

        assert_eq!(
            chunks,
            vec!["alpha beta", "gamma delta", "epsilon zeta", "eta theta"]
        );
    }

    #[test]
    fn multibyte_text_is_measured_in_characters() {
        let text = "é".repeat(30);
        let chunks = split_text(&text, config(10, 0)).unwrap();
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.chars().count() == 10));
    }

    #[test]
    fn page_chunks_have_contiguous_ordinals_and_shared_metadata() {
        let document = SourceDocument {
            absolute_path: PathBuf::from("/tmp/PDFs/PCEM2/Cardiologie/lecture1.pdf"),
            relative_path: "PCEM2/Cardiologie/lecture1.pdf".to_string(),
            niveau: "PCEM2".to_string(),
            matiere: "Cardiologie".to_string(),
            cours: "lecture1".to_string(),
        };
        let metadata = document.metadata();
        let text = "Phrase numéro un. ".repeat(20);

        let chunks = build_page_chunks(&document, &metadata, 3, &text, config(80, 20)).unwrap();

        assert!(chunks.len() > 1);
        for (position, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.ordinal as usize, position);
            assert_eq!(chunk.page_number, 3);
            assert_eq!(chunk.metadata, metadata);
            assert_eq!(chunk.chunk_id.len(), 64);
        }
        assert_ne!(chunks[0].chunk_id, chunks[1].chunk_id);
    }
}
