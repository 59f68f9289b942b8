use crate::error::{IngestError, Result};
use crate::models::ExtractedPage;
use lopdf::Document;

pub trait PdfExtractor {
    /// Returns one entry per physical page, in page order. A document that
    /// cannot be opened fails as a whole.
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<ExtractedPage>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, pdf: &[u8]) -> Result<Vec<ExtractedPage>> {
        let document =
            Document::load_mem(pdf).map_err(|error| IngestError::PdfParse(error.to_string()))?;
        ensure_unencrypted(&document)?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().into_keys() {
            let text = document
                .extract_text(&[page_number])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;

            pages.push(ExtractedPage {
                page_number,
                raw_text: join_text_runs(&text),
            });
        }

        if pages.is_empty() {
            return Err(IngestError::PdfParse("pdf has no pages".to_string()));
        }

        Ok(pages)
    }
}

pub fn extract_page_texts(pdf: &[u8]) -> Result<Vec<ExtractedPage>> {
    LopdfExtractor.extract_pages(pdf)
}

fn ensure_unencrypted(document: &Document) -> Result<()> {
    if document.trailer.get(b"Encrypt").is_ok() {
        return Err(IngestError::EncryptedPdf);
    }
    Ok(())
}

fn join_text_runs(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|run| !run.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn single_page_document(line: &str) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn single_page_pdf(line: &str) -> Vec<u8> {
        let mut doc = single_page_document(line);
        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).expect("pdf serializes");
        buffer
    }

    #[test]
    fn text_runs_are_joined_with_spaces() {
        assert_eq!(
            join_text_runs("Cours 1\n  Anatomie \n\nRésumé\n"),
            "Cours 1 Anatomie Résumé"
        );
    }

    #[test]
    fn extracts_every_page_with_one_based_numbers() {
        let pdf = single_page_pdf("Hello World");
        let pages = extract_page_texts(&pdf).expect("generated pdf should parse");

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_number, 1);
        assert!(pages[0].raw_text.contains("Hello"));
    }

    #[test]
    fn encrypt_entry_in_trailer_is_rejected() {
        let mut doc = single_page_document("Confidentiel");
        assert!(ensure_unencrypted(&doc).is_ok());

        let encrypt_id = doc.add_object(dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "Length" => 40,
        });
        doc.trailer.set("Encrypt", encrypt_id);

        assert!(matches!(
            ensure_unencrypted(&doc),
            Err(IngestError::EncryptedPdf)
        ));
    }

    #[test]
    fn corrupt_buffer_is_a_document_level_error() {
        let result = extract_page_texts(b"%PDF-1.4\n%broken");
        assert!(matches!(result, Err(IngestError::PdfParse(_))));
    }
}
