use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::aggregator::{aggregate, DocumentOutcome};
use super::assessment::AssessmentClient;
use super::document_parser::ResumeDocumentParser;
use super::errors::CoreError;
use super::models::{ResultBatch, RuntimeSettings, SkipReason, SkippedDocument, SourceDocument};
use super::ocr::TesseractCliOcrService;
use super::pdf::PdfTextExtractor;
use super::response_parser;
use super::secret_store::ApiCredential;

enum BatchInput {
    Loaded(SourceDocument),
    File(PathBuf),
}

/// Runs each document through extract, assess, parse, in upload order.
pub struct ScreeningService {
    parser: ResumeDocumentParser,
    assessor: AssessmentClient,
}

impl ScreeningService {
    pub fn new(parser: ResumeDocumentParser, assessor: AssessmentClient) -> Self {
        Self { parser, assessor }
    }

    pub fn from_settings(
        settings: &RuntimeSettings,
        credential: ApiCredential,
    ) -> anyhow::Result<Self> {
        let ocr = TesseractCliOcrService::from_settings(settings);
        let parser = ResumeDocumentParser::new(PdfTextExtractor::new(Arc::new(ocr)));
        let assessor = AssessmentClient::from_settings(settings, credential)?;
        Ok(Self::new(parser, assessor))
    }

    pub async fn screen_batch(
        &self,
        documents: Vec<SourceDocument>,
        job_description: &str,
    ) -> anyhow::Result<ResultBatch> {
        let inputs = documents.into_iter().map(BatchInput::Loaded).collect();
        self.run_batch(inputs, job_description).await
    }

    /// Like `screen_batch`, reading each file just before it is processed.
    /// A file that cannot be read is skipped in place.
    pub async fn screen_files(
        &self,
        paths: &[PathBuf],
        job_description: &str,
    ) -> anyhow::Result<ResultBatch> {
        let inputs = paths.iter().cloned().map(BatchInput::File).collect();
        self.run_batch(inputs, job_description).await
    }

    async fn run_batch(
        &self,
        inputs: Vec<BatchInput>,
        job_description: &str,
    ) -> anyhow::Result<ResultBatch> {
        if job_description.trim().is_empty() {
            return Err(
                CoreError::InvalidRequest("job description is required".to_string()).into(),
            );
        }

        let batch_id = Uuid::new_v4();
        let total = inputs.len();
        let span = info_span!("batch", %batch_id, documents = total);

        async move {
            let mut outcomes = Vec::with_capacity(total);
            for (index, input) in inputs.into_iter().enumerate() {
                let document = match load_input(input).await {
                    Ok(document) => document,
                    Err(skipped) => {
                        outcomes.push(DocumentOutcome::Skipped(skipped));
                        continue;
                    }
                };
                info!(file = %document.file_name, "processing {}/{}", index + 1, total);
                outcomes.push(self.screen_document(document, job_description).await);
            }

            let batch = aggregate(batch_id, outcomes);
            info!(
                documents = batch.total_documents(),
                assessed = batch.records.len(),
                skipped = batch.skipped.len(),
                "batch complete"
            );
            Ok(batch)
        }
        .instrument(span)
        .await
    }

    async fn screen_document(
        &self,
        document: SourceDocument,
        job_description: &str,
    ) -> DocumentOutcome {
        let extracted = self.parser.extract(&document).await;
        drop(document);

        if let Some(reason) = extracted.skip_reason() {
            return DocumentOutcome::Skipped(SkippedDocument {
                file_name: extracted.file_name,
                reason,
            });
        }

        let reply = self.assessor.assess(&extracted.text, job_description).await;
        if reply.is_failure() {
            warn!(file = %extracted.file_name, "assessment failed, fields recorded as N/A");
        }
        let raw_reply = reply.text();
        let fields = response_parser::parse(&raw_reply);

        DocumentOutcome::Assessed(fields.into_record(&extracted.file_name, raw_reply))
    }
}

async fn load_input(input: BatchInput) -> Result<SourceDocument, SkippedDocument> {
    let path = match input {
        BatchInput::Loaded(document) => return Ok(document),
        BatchInput::File(path) => path,
    };

    let file_name = display_name(&path);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(SourceDocument::new(file_name, bytes)),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read document");
            Err(SkippedDocument {
                file_name,
                reason: SkipReason::ReadFailed(err.to_string()),
            })
        }
    }
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|v| v.to_str())
        .map(|v| v.to_string())
        .unwrap_or_else(|| path.display().to_string())
}
