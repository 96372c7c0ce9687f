use std::panic;
use std::sync::Arc;

use tracing::{debug, info};

use super::models::ExtractionFailure;
use super::ocr::OcrEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfExtraction {
    pub text: String,
    pub ocr_used: bool,
    pub failure: Option<ExtractionFailure>,
}

pub struct PdfTextExtractor {
    ocr_engine: Arc<dyn OcrEngine>,
}

impl PdfTextExtractor {
    pub fn new(ocr_engine: Arc<dyn OcrEngine>) -> Self {
        Self { ocr_engine }
    }

    /// Reads the text layer; when it is blank or unreadable, OCRs the rendered pages.
    pub async fn extract_text_with_ocr_fallback(&self, data: &[u8]) -> PdfExtraction {
        let layer_error = match extract_text_layer(data) {
            Ok(text) if !text.trim().is_empty() => {
                return PdfExtraction {
                    text,
                    ocr_used: false,
                    failure: None,
                };
            }
            Ok(_) => None,
            Err(err) => {
                debug!(error = %err, "PDF text layer unreadable");
                Some(err)
            }
        };

        info!("PDF has no text layer, falling back to OCR");
        match self.ocr_engine.recognize_pages(data).await {
            Ok(pages) => {
                let text = pages
                    .iter()
                    .map(|page| page.trim_end())
                    .collect::<Vec<&str>>()
                    .join("\n");

                let failure = match layer_error {
                    Some(err) if text.trim().is_empty() => {
                        Some(ExtractionFailure::Parse(format!("{err:#}")))
                    }
                    _ => None,
                };

                PdfExtraction {
                    text,
                    ocr_used: true,
                    failure,
                }
            }
            Err(err) => PdfExtraction {
                text: String::new(),
                ocr_used: true,
                failure: Some(match layer_error {
                    Some(layer_err) => ExtractionFailure::Parse(format!("{layer_err:#}")),
                    None => ExtractionFailure::Ocr(format!("{err:#}")),
                }),
            },
        }
    }
}

fn extract_text_layer(data: &[u8]) -> anyhow::Result<String> {
    // pdf-extract panics on some malformed inputs instead of returning an error.
    match panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data)) {
        Ok(result) => Ok(result?),
        Err(_) => Err(anyhow::anyhow!("PDF text extraction panicked")),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    use super::*;

    pub(crate) struct FakeOcr {
        pub pages: Option<Vec<String>>,
        pub calls: AtomicUsize,
    }

    impl FakeOcr {
        pub(crate) fn with_pages(pages: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                pages: Some(pages.iter().map(|p| p.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing() -> Arc<Self> {
            Arc::new(Self {
                pages: None,
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl OcrEngine for FakeOcr {
        async fn recognize_pages(&self, _pdf_bytes: &[u8]) -> anyhow::Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages
                .clone()
                .ok_or_else(|| anyhow::anyhow!("tesseract not installed"))
        }
    }

    /// Builds a one-page PDF; `None` produces a page with no text operators.
    pub(crate) fn build_pdf(text: Option<&str>) -> Vec<u8> {
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

        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
            None => Vec::new(),
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
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
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[tokio::test]
    async fn text_layer_is_used_without_ocr() {
        let ocr = FakeOcr::with_pages(&["should not be used"]);
        let extractor = PdfTextExtractor::new(ocr.clone());

        let result = extractor
            .extract_text_with_ocr_fallback(&build_pdf(Some("Kubernetes Engineer")))
            .await;

        assert!(result.text.contains("Kubernetes"));
        assert!(!result.ocr_used);
        assert_eq!(result.failure, None);
        assert_eq!(ocr.call_count(), 0);
    }

    #[tokio::test]
    async fn image_only_pdf_falls_back_to_ocr_in_page_order() {
        let ocr = FakeOcr::with_pages(&["Page one text\n", "Page two text"]);
        let extractor = PdfTextExtractor::new(ocr.clone());

        let result = extractor
            .extract_text_with_ocr_fallback(&build_pdf(None))
            .await;

        assert_eq!(result.text, "Page one text\nPage two text");
        assert!(result.ocr_used);
        assert_eq!(ocr.call_count(), 1);
    }

    #[tokio::test]
    async fn ocr_failure_is_a_distinct_failure() {
        let extractor = PdfTextExtractor::new(FakeOcr::failing());

        let result = extractor
            .extract_text_with_ocr_fallback(&build_pdf(None))
            .await;

        assert!(result.text.is_empty());
        assert!(matches!(result.failure, Some(ExtractionFailure::Ocr(_))));
    }

    #[tokio::test]
    async fn corrupt_pdf_reports_parse_failure() {
        let extractor = PdfTextExtractor::new(FakeOcr::failing());

        let result = extractor
            .extract_text_with_ocr_fallback(b"definitely not a pdf")
            .await;

        assert!(result.text.is_empty());
        assert!(matches!(result.failure, Some(ExtractionFailure::Parse(_))));
    }
}
