use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum JobType {
    #[default]
    Remote,
    Hybrid,
    Onsite,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreeningQuestion {
    pub question: String,
    pub answer: String,
}

/// Structured job requirements, rendered into the job description text
/// that resumes are assessed against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct JobPosting {
    pub title: String,
    pub min_years_experience: u32,
    pub job_type: JobType,
    pub location: String,
    pub requirements: String,
    #[serde(deserialize_with = "skills_from_list_or_csv")]
    pub skills: Vec<String>,
    pub screening_questions: Vec<ScreeningQuestion>,
}

impl JobPosting {
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read job posting {}", path.display()))?;

        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in job posting {}", path.display()))?;
        if !value.is_object() {
            anyhow::bail!(
                "invalid JSON in job posting {}: expected an object",
                path.display()
            );
        }

        let posting = serde_json::from_value::<JobPosting>(value)
            .with_context(|| format!("invalid JSON in job posting {}", path.display()))?;
        posting.validate()?;
        Ok(posting)
    }

    /// A posting needs a title, requirements or skills to assess against.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty()
            && self.requirements.trim().is_empty()
            && self.skills.is_empty()
        {
            return Err(CoreError::InvalidRequest(
                "job posting has no title, requirements or skills".to_string(),
            ));
        }
        Ok(())
    }

    pub fn to_job_description(&self) -> String {
        let mut out = String::new();

        if !self.title.trim().is_empty() {
            let _ = writeln!(out, "Job Title: {}", self.title.trim());
        }
        let _ = writeln!(
            out,
            "Minimum Years of Experience: {}",
            self.min_years_experience
        );
        let _ = writeln!(out, "Job Type: {:?}", self.job_type);
        if !self.location.trim().is_empty() {
            let _ = writeln!(out, "Location: {}", self.location.trim());
        }
        if !self.skills.is_empty() {
            let _ = writeln!(out, "Required Skills: {}", self.skills.join(", "));
        }
        if !self.requirements.trim().is_empty() {
            let _ = writeln!(out, "\nRequirements:\n{}", self.requirements.trim());
        }

        let questions: Vec<&ScreeningQuestion> = self
            .screening_questions
            .iter()
            .filter(|q| !q.question.trim().is_empty())
            .collect();
        if !questions.is_empty() {
            let _ = writeln!(out, "\nScreening Questions:");
            for q in questions {
                let _ = writeln!(
                    out,
                    "- {} (acceptable answer: {})",
                    q.question.trim(),
                    q.answer.trim()
                );
            }
        }

        out.trim_end().to_string()
    }
}

pub fn split_skills(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .map(|skill| skill.to_string())
        .collect()
}

fn skills_from_list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Skills {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Skills::deserialize(deserializer)? {
        Skills::List(list) => list
            .iter()
            .flat_map(|item| split_skills(item))
            .collect(),
        Skills::Csv(raw) => split_skills(&raw),
    })
}
