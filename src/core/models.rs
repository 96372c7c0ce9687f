use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Value used for any assessment field the model reply did not contain.
pub const NOT_AVAILABLE: &str = "N/A";

/// Reply text recorded when a document produced no text to assess.
pub const NO_CONTENT_MARKER: &str = "No content extracted from CV.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Unsupported,
}

impl DocumentFormat {
    pub fn from_file_name(file_name: &str) -> Self {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            _ => DocumentFormat::Unsupported,
        }
    }
}

/// An uploaded resume. Read once, handed to the extractor, then dropped.
#[derive(Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub format: DocumentFormat,
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let format = DocumentFormat::from_file_name(&file_name);
        Self {
            file_name,
            format,
            bytes,
        }
    }
}

impl fmt::Debug for SourceDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDocument")
            .field("file_name", &self.file_name)
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum ExtractionFailure {
    Parse(String),
    Ocr(String),
    Unsupported(String),
}

impl fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionFailure::Parse(cause) => write!(f, "Parse error: {cause}"),
            ExtractionFailure::Ocr(cause) => write!(f, "OCR error: {cause}"),
            ExtractionFailure::Unsupported(file_name) => {
                write!(f, "Unsupported file type: {file_name}")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedText {
    pub file_name: String,
    pub format: DocumentFormat,
    pub text: String,
    pub ocr_used: bool,
    pub failure: Option<ExtractionFailure>,
}

impl ExtractedText {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Why this document cannot be assessed, or `None` when it has usable text.
    pub fn skip_reason(&self) -> Option<SkipReason> {
        if !self.is_blank() {
            return None;
        }

        Some(match &self.failure {
            Some(ExtractionFailure::Parse(cause)) => SkipReason::ExtractionFailed(cause.clone()),
            Some(ExtractionFailure::Ocr(cause)) => SkipReason::OcrFailed(cause.clone()),
            Some(ExtractionFailure::Unsupported(_)) => SkipReason::UnsupportedFormat,
            None => SkipReason::EmptyText,
        })
    }
}

/// Outcome of one assessment call. Never an `Err`: failures are data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum AssessmentReply {
    Completed(String),
    NoContent,
    Failed(String),
}

impl AssessmentReply {
    pub fn text(&self) -> String {
        match self {
            AssessmentReply::Completed(text) => text.clone(),
            AssessmentReply::NoContent => NO_CONTENT_MARKER.to_string(),
            AssessmentReply::Failed(cause) => format!("Model API error: {cause}"),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, AssessmentReply::Failed(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAssessment {
    pub file_name: String,
    pub summary: String,
    #[serde(rename = "match")]
    pub match_assessment: String,
    pub recommendation: String,
    pub raw_reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum SkipReason {
    EmptyText,
    ExtractionFailed(String),
    OcrFailed(String),
    UnsupportedFormat,
    ReadFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyText => f.write_str(NO_CONTENT_MARKER),
            SkipReason::ExtractionFailed(cause) => write!(f, "Parse error: {cause}"),
            SkipReason::OcrFailed(cause) => write!(f, "OCR error: {cause}"),
            SkipReason::UnsupportedFormat => f.write_str("Unsupported file type"),
            SkipReason::ReadFailed(cause) => write!(f, "Read error: {cause}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDocument {
    pub file_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultBatch {
    pub batch_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub records: Vec<ParsedAssessment>,
    pub skipped: Vec<SkippedDocument>,
}

impl ResultBatch {
    /// Every input document lands in exactly one of `records` or `skipped`.
    pub fn total_documents(&self) -> usize {
        self.records.len() + self.skipped.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeSettings {
    pub model: String,
    pub temperature: f32,
    pub api_base_url: String,
    pub tesseract_path: String,
    pub pdftoppm_path: String,
    pub ocr_language: String,
    pub ocr_dpi: u32,
    pub ocr_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub max_attempts: usize,
    pub retry_delay_seconds: f64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.4,
            api_base_url: "https://api.openai.com/v1".to_string(),
            tesseract_path: "tesseract".to_string(),
            pdftoppm_path: "pdftoppm".to_string(),
            ocr_language: "eng".to_string(),
            ocr_dpi: 300,
            ocr_timeout_seconds: 120,
            request_timeout_seconds: 120,
            max_attempts: 1,
            retry_delay_seconds: 1.0,
        }
    }
}

impl RuntimeSettings {
    pub fn sanitized(mut self) -> Self {
        let defaults = RuntimeSettings::default();

        if self.model.trim().is_empty() {
            self.model = defaults.model;
        }
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = defaults.api_base_url;
        }
        if self.tesseract_path.trim().is_empty() {
            self.tesseract_path = defaults.tesseract_path;
        }
        if self.pdftoppm_path.trim().is_empty() {
            self.pdftoppm_path = defaults.pdftoppm_path;
        }
        if self.ocr_language.trim().is_empty() {
            self.ocr_language = defaults.ocr_language;
        }

        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
        self.temperature = if self.temperature.is_finite() {
            self.temperature.clamp(0.0, 2.0)
        } else {
            defaults.temperature
        };
        self.ocr_dpi = self.ocr_dpi.max(72);
        self.ocr_timeout_seconds = self.ocr_timeout_seconds.max(1);
        self.request_timeout_seconds = self.request_timeout_seconds.max(1);
        self.max_attempts = self.max_attempts.max(1);
        self.retry_delay_seconds = self.retry_delay_seconds.max(0.1);
        self
    }
}
