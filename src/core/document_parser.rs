use std::io::{Cursor, Read};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use super::models::{DocumentFormat, ExtractedText, ExtractionFailure, SourceDocument};
use super::pdf::PdfTextExtractor;

pub struct ResumeDocumentParser {
    pdf_text_extractor: PdfTextExtractor,
}

impl ResumeDocumentParser {
    pub fn new(pdf_text_extractor: PdfTextExtractor) -> Self {
        Self { pdf_text_extractor }
    }

    /// Never fails: unreadable documents come back blank with a recorded failure.
    pub async fn extract(&self, document: &SourceDocument) -> ExtractedText {
        let mut ocr_used = false;

        let (text, failure) = match document.format {
            DocumentFormat::Pdf => {
                let extraction = self
                    .pdf_text_extractor
                    .extract_text_with_ocr_fallback(&document.bytes)
                    .await;
                ocr_used = extraction.ocr_used;
                (extraction.text, extraction.failure)
            }
            DocumentFormat::Docx => match extract_docx_text(&document.bytes) {
                Ok(text) => (text, None),
                Err(err) => (String::new(), Some(ExtractionFailure::Parse(format!("{err:#}")))),
            },
            DocumentFormat::Unsupported => (
                String::new(),
                Some(ExtractionFailure::Unsupported(document.file_name.clone())),
            ),
        };

        if let Some(failure) = &failure {
            warn!(file = %document.file_name, "{failure}");
        } else {
            debug!(
                file = %document.file_name,
                chars = text.len(),
                ocr_used,
                "extracted document text"
            );
        }

        ExtractedText {
            file_name: document.file_name.clone(),
            format: document.format,
            text,
            ocr_used,
            failure,
        }
    }
}

/// Paragraph texts of `word/document.xml`, joined by newlines in document order.
pub fn extract_docx_text(data: &[u8]) -> anyhow::Result<String> {
    let cursor = Cursor::new(data);
    let mut archive = zip::ZipArchive::new(cursor)?;

    let mut document_file = archive.by_name("word/document.xml")?;
    let mut xml = String::new();
    document_file.read_to_string(&mut xml)?;

    let mut reader = Reader::from_str(&xml);

    let mut buf = Vec::new();
    let mut paragraphs: Vec<String> = Vec::new();
    // Slots of the open `w:p` elements, innermost last. Text boxes nest a
    // `w:p` inside another, and each paragraph is ordered by where it starts.
    let mut open_paragraphs: Vec<usize> = Vec::new();
    let mut in_text_run = false;

    loop {
        let current = open_paragraphs.last().copied();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    open_paragraphs.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match (e.name().as_ref(), current) {
                (b"w:p", _) => paragraphs.push(String::new()),
                (b"w:tab", Some(index)) => paragraphs[index].push('\t'),
                (b"w:br" | b"w:cr", Some(index)) => paragraphs[index].push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:p" => {
                    open_paragraphs.pop();
                }
                b"w:t" => in_text_run = false,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let (Some(index), true) = (current, in_text_run) {
                    paragraphs[index].push_str(&e.xml_content()?);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if let (Some(index), true) = (current, in_text_run) {
                    if let Some(ch) = e.resolve_char_ref()? {
                        paragraphs[index].push(ch);
                    } else {
                        let name = e.decode()?;
                        if let Some(value) = resolve_predefined_entity(&name) {
                            paragraphs[index].push_str(value);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(err) => return Err(err.into()),
            _ => {}
        }

        buf.clear();
    }

    Ok(paragraphs.join("\n"))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::core::pdf::tests::{build_pdf, FakeOcr};

    /// Builds a minimal DOCX whose body holds one `w:p` per entry.
    pub(crate) fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| {
                if p.is_empty() {
                    "<w:p/>".to_string()
                } else {
                    format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>")
                }
            })
            .collect();
        build_docx_body(&body)
    }

    /// Builds a DOCX around a raw `w:body` fragment.
    pub(crate) fn build_docx_body(body: &str) -> Vec<u8> {
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            writer
                .start_file(
                    "word/document.xml",
                    SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored),
                )
                .unwrap();
            writer.write_all(xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    fn parser_with(ocr: std::sync::Arc<FakeOcr>) -> ResumeDocumentParser {
        ResumeDocumentParser::new(PdfTextExtractor::new(ocr))
    }

    #[test]
    fn docx_paragraphs_are_joined_in_order() {
        let docx = build_docx(&["Jane Doe", "", "5 years DevOps experience, AWS, Terraform"]);
        let text = extract_docx_text(&docx).unwrap();
        assert_eq!(text, "Jane Doe\n\n5 years DevOps experience, AWS, Terraform");
    }

    #[test]
    fn docx_runs_and_entities_are_concatenated() {
        let docx = build_docx(&["Ops </w:t></w:r><w:r><w:t>&amp; Cloud"]);
        let text = extract_docx_text(&docx).unwrap();
        assert_eq!(text, "Ops & Cloud");
    }

    #[test]
    fn text_box_paragraphs_keep_the_surrounding_paragraph() {
        let docx = build_docx_body(
            "<w:p><w:r><w:t xml:space=\"preserve\">Jane Doe </w:t></w:r>\
             <w:r><w:pict><w:txbxContent>\
             <w:p><w:r><w:t>Contact box</w:t></w:r></w:p>\
             </w:txbxContent></w:pict></w:r>\
             <w:r><w:t>Senior SRE</w:t></w:r></w:p>\
             <w:p><w:r><w:t>AWS</w:t></w:r></w:p>",
        );

        let text = extract_docx_text(&docx).unwrap();
        assert_eq!(text, "Jane Doe Senior SRE\nContact box\nAWS");
    }

    #[test]
    fn empty_docx_yields_empty_string() {
        let docx = build_docx(&[]);
        assert_eq!(extract_docx_text(&docx).unwrap(), "");
    }

    #[tokio::test]
    async fn corrupt_docx_is_captured_as_failure() {
        let parser = parser_with(FakeOcr::failing());
        let document = SourceDocument::new("broken.docx", b"not a zip".to_vec());

        let extracted = parser.extract(&document).await;

        assert!(extracted.text.is_empty());
        assert!(matches!(extracted.failure, Some(ExtractionFailure::Parse(_))));
    }

    #[tokio::test]
    async fn unsupported_format_yields_empty_text_without_ocr() {
        let ocr = FakeOcr::with_pages(&["text"]);
        let parser = parser_with(ocr.clone());
        let document = SourceDocument::new("resume.txt", b"plain text resume".to_vec());

        let extracted = parser.extract(&document).await;

        assert!(extracted.text.is_empty());
        assert_eq!(
            extracted.failure,
            Some(ExtractionFailure::Unsupported("resume.txt".to_string()))
        );
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn pdf_documents_route_through_ocr_fallback() {
        let ocr = FakeOcr::with_pages(&["Scanned resume"]);
        let parser = parser_with(ocr.clone());
        let document = SourceDocument::new("scan.pdf", build_pdf(None));

        let extracted = parser.extract(&document).await;

        assert_eq!(extracted.text, "Scanned resume");
        assert!(extracted.ocr_used);
        assert_eq!(ocr.call_count(), 1);
    }
}
