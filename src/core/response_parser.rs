use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::models::{ParsedAssessment, NOT_AVAILABLE};

pub const FIELD_LABELS: [&str; 3] = ["Summary", "Match", "Recommendation"];

// A label at the start of a line, optionally numbered or wrapped in markdown
// emphasis, followed by `:` or `-` and the rest of that line.
static SUMMARY_RE: Lazy<Regex> = Lazy::new(|| line_start_regex("summary"));
static MATCH_RE: Lazy<Regex> = Lazy::new(|| line_start_regex("match"));
static RECOMMENDATION_RE: Lazy<Regex> = Lazy::new(|| line_start_regex("recommendation"));

// Fallback: the label anywhere in a line ("Overall Match: ..."), colon required.
static SUMMARY_INLINE_RE: Lazy<Regex> = Lazy::new(|| inline_regex("summary"));
static MATCH_INLINE_RE: Lazy<Regex> = Lazy::new(|| inline_regex("match"));
static RECOMMENDATION_INLINE_RE: Lazy<Regex> = Lazy::new(|| inline_regex("recommendation"));

static JSON_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*(\{.*\})\s*```$").unwrap());

fn line_start_regex(label: &str) -> Regex {
    Regex::new(&format!(
        r"(?im)^[ \t>*#_\-]*(?:\d+[.)][ \t*_]*)?{label}\b[ \t*_]*(?:[:\-][ \t*_]*)?([^\s:\-][^\r\n]*)"
    ))
    .unwrap()
}

fn inline_regex(label: &str) -> Regex {
    Regex::new(&format!(r"(?i)\b{label}[ \t*_]*:[ \t*_]*([^\s:][^\r\n]*)")).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentFields {
    pub summary: String,
    pub match_assessment: String,
    pub recommendation: String,
}

impl AssessmentFields {
    pub fn into_record(self, file_name: &str, raw_reply: String) -> ParsedAssessment {
        ParsedAssessment {
            file_name: file_name.to_string(),
            summary: self.summary,
            match_assessment: self.match_assessment,
            recommendation: self.recommendation,
            raw_reply,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StructuredReply {
    summary: Option<String>,
    #[serde(rename = "match")]
    match_assessment: Option<String>,
    recommendation: Option<String>,
}

/// Splits a model reply into its three labelled fields.
///
/// A JSON object reply is read directly; anything else goes through the
/// labelled-line patterns. Missing fields become `N/A`.
pub fn parse(reply_text: &str) -> AssessmentFields {
    if let Some(fields) = parse_structured(reply_text) {
        return fields;
    }

    AssessmentFields {
        summary: capture_field(&SUMMARY_RE, &SUMMARY_INLINE_RE, reply_text),
        match_assessment: capture_field(&MATCH_RE, &MATCH_INLINE_RE, reply_text),
        recommendation: capture_field(
            &RECOMMENDATION_RE,
            &RECOMMENDATION_INLINE_RE,
            reply_text,
        ),
    }
}

fn parse_structured(reply_text: &str) -> Option<AssessmentFields> {
    let trimmed = reply_text.trim();
    let body = match JSON_FENCE_RE.captures(trimmed) {
        Some(captures) => captures.get(1)?.as_str(),
        None if trimmed.starts_with('{') => trimmed,
        None => return None,
    };

    let reply = serde_json::from_str::<StructuredReply>(body).ok()?;
    if reply.summary.is_none() && reply.match_assessment.is_none() && reply.recommendation.is_none()
    {
        return None;
    }

    Some(AssessmentFields {
        summary: or_not_available(reply.summary),
        match_assessment: or_not_available(reply.match_assessment),
        recommendation: or_not_available(reply.recommendation),
    })
}

fn capture_field(line_start: &Regex, inline: &Regex, text: &str) -> String {
    first_capture(line_start, text)
        .or_else(|| first_capture(inline, text))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

fn first_capture(regex: &Regex, text: &str) -> Option<String> {
    regex
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|value| !value.is_empty())
}

fn or_not_available(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
