use anyhow::Context;
use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use super::models::{ParsedAssessment, ResultBatch, SkippedDocument};

pub const HEADER_COLUMNS: [&str; 4] = ["File Name", "Summary", "Match", "Recommendation"];
pub const RAW_REPLY_COLUMN: &str = "Raw Reply";

/// Terminal state of one document in a batch.
#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Assessed(ParsedAssessment),
    Skipped(SkippedDocument),
}

/// Collects outcomes in upload order, logging one warning per skipped document.
pub fn aggregate(batch_id: Uuid, outcomes: Vec<DocumentOutcome>) -> ResultBatch {
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for outcome in outcomes {
        match outcome {
            DocumentOutcome::Assessed(record) => records.push(record),
            DocumentOutcome::Skipped(document) => {
                warn!(
                    file = %document.file_name,
                    reason = %document.reason,
                    "skipped document"
                );
                skipped.push(document);
            }
        }
    }

    ResultBatch {
        batch_id,
        generated_at: Utc::now(),
        records,
        skipped,
    }
}

/// UTF-8 CSV with a header row and one row per record, no index column.
pub fn to_csv(batch: &ResultBatch, include_raw_reply: bool) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let mut header: Vec<&str> = HEADER_COLUMNS.to_vec();
    if include_raw_reply {
        header.push(RAW_REPLY_COLUMN);
    }
    writer.write_record(&header)?;

    for record in &batch.records {
        let mut row = vec![
            record.file_name.as_str(),
            record.summary.as_str(),
            record.match_assessment.as_str(),
            record.recommendation.as_str(),
        ];
        if include_raw_reply {
            row.push(record.raw_reply.as_str());
        }
        writer.write_record(&row)?;
    }

    writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("failed to flush CSV output: {}", err.error()))
}

pub fn to_json(batch: &ResultBatch) -> anyhow::Result<String> {
    serde_json::to_string_pretty(batch).context("failed to serialize result batch")
}
