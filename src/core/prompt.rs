//! The assessment instruction sent to the model.
//!
//! The reply format requested here is the grammar `response_parser` reads
//! back, so the labels must stay in sync with `response_parser::FIELD_LABELS`.

pub fn build_prompt(job_description: &str, resume_text: &str) -> String {
    format!(
        "You are a technical recruiter. Assess the following candidate against the job description.

=== Job Description ===
{job_description}

=== Candidate Resume ===
{resume_text}

Respond in this exact format:

Summary: <short summary of experience>

Match: <how well the candidate matches the qualifications>

Recommendation: <Yes/No + reason>
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::response_parser::FIELD_LABELS;

    #[test]
    fn prompt_embeds_inputs_and_requests_every_field() {
        let prompt = build_prompt("Need 3+ years DevOps, AWS", "5 years DevOps experience");

        assert!(prompt.contains("=== Job Description ===\nNeed 3+ years DevOps, AWS\n"));
        assert!(prompt.contains("=== Candidate Resume ===\n5 years DevOps experience\n"));
        for label in FIELD_LABELS {
            assert!(prompt.contains(&format!("\n{label}: <")), "missing {label}");
        }
    }

    #[test]
    fn prompt_is_deterministic() {
        assert_eq!(build_prompt("jd", "cv"), build_prompt("jd", "cv"));
    }
}
