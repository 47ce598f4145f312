// Prompt template for resume evaluation.
// The requested JSON shape is derived from the FieldSet so the interpreter and
// the prompt can never disagree on key names.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Persona and task framing placed ahead of the embedded documents.
pub const EVALUATION_PERSONA: &str = "\
As an experienced Applicant Tracking System (ATS) analyst,
with profound knowledge in technology, software engineering, data science,
and big data engineering, your role involves evaluating resumes against job descriptions.
Recognizing the competitive job market, provide top-notch assistance for resume improvement.
Your goal is to analyze the resume against the given job description,
assign a percentage match based on key criteria, and pinpoint missing keywords accurately.";

/// Output contract appended after the documents.
pub const RESPONSE_SHAPE_INSTRUCTION: &str =
    "I want the response in one single string having the structure";

pub const JSON_ONLY_INSTRUCTION: &str = "Respond with that JSON object only. \
    Do NOT use markdown code fences. \
    Do NOT include explanations outside the JSON object.";

const MINIMAL_FIELDS: &[&str] = &[
    "Job Description Match",
    "Missing Keywords",
    "Candidate Summary",
    "Experience",
];

const EXTENDED_FIELDS: &[&str] = &[
    "Match",
    "Suitability",
    "Summary",
    "Experience",
    "Experience Details",
    "Projects",
    "Project Details",
    "Certifications",
    "Certification Details",
    "Achievements",
    "Achievement Details",
    "Skills",
    "Missing Keywords",
];

/// Which set of fields the model is asked to return.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldSet {
    #[default]
    Minimal,
    Extended,
}

impl FieldSet {
    /// Field names in the order they are requested and rendered.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            FieldSet::Minimal => MINIMAL_FIELDS,
            FieldSet::Extended => EXTENDED_FIELDS,
        }
    }

    /// The field carrying the match percentage.
    pub fn match_field(self) -> &'static str {
        match self {
            FieldSet::Minimal => "Job Description Match",
            FieldSet::Extended => "Match",
        }
    }

    /// Flat JSON object literal listing every requested key.
    pub fn json_shape(self) -> String {
        let match_field = self.match_field();
        let pairs: Vec<String> = self
            .fields()
            .iter()
            .map(|f| {
                let placeholder = if *f == match_field { "%" } else { "" };
                format!("\"{f}\":\"{placeholder}\"")
            })
            .collect();
        format!("{{{}}}", pairs.join(","))
    }
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSet::Minimal => write!(f, "minimal"),
            FieldSet::Extended => write!(f, "extended"),
        }
    }
}

impl FromStr for FieldSet {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" => Ok(FieldSet::Minimal),
            "extended" => Ok(FieldSet::Extended),
            other => Err(format!(
                "unknown field set '{other}' (expected 'minimal' or 'extended')"
            )),
        }
    }
}

/// Resume text and job description for one evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationRequest {
    resume_text: String,
    job_description: String,
}

impl EvaluationRequest {
    pub fn new(resume_text: impl Into<String>, job_description: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            job_description: job_description.into(),
        }
    }

    pub fn resume_text(&self) -> &str {
        &self.resume_text
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }
}

/// The final prompt string sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPrompt(String);

impl EvaluationPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Embeds the request into the template.
///
/// Inputs are inserted verbatim and in a single pass, so text inside a resume
/// that happens to look like a placeholder is never expanded.
pub fn build_prompt(request: &EvaluationRequest, field_set: FieldSet) -> EvaluationPrompt {
    EvaluationPrompt(format!(
        "{persona}\nresume:{resume}\ndescription:{description}\n{shape_instruction}\n{shape}\n{json_only}\n",
        persona = EVALUATION_PERSONA,
        resume = request.resume_text(),
        description = request.job_description(),
        shape_instruction = RESPONSE_SHAPE_INSTRUCTION,
        shape = field_set.json_shape(),
        json_only = JSON_ONLY_INSTRUCTION,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_inputs_verbatim() {
        let request = EvaluationRequest::new(
            "Jane Doe\nRust, Go, \"Kafka\" {braces}",
            "Senior Engineer\n- 5+ years Rust",
        );
        let prompt = build_prompt(&request, FieldSet::Minimal);
        assert!(prompt.as_str().contains("Jane Doe\nRust, Go, \"Kafka\" {braces}"));
        assert!(prompt.as_str().contains("Senior Engineer\n- 5+ years Rust"));
    }

    #[test]
    fn test_prompt_with_empty_inputs_still_builds() {
        let request = EvaluationRequest::new("", "");
        let prompt = build_prompt(&request, FieldSet::Extended);
        assert!(prompt.as_str().starts_with(EVALUATION_PERSONA));
        assert!(prompt.as_str().contains("resume:\ndescription:\n"));
    }

    #[test]
    fn test_placeholder_like_text_is_not_expanded() {
        let request = EvaluationRequest::new("see {description} and {resume}", "JD");
        let prompt = build_prompt(&request, FieldSet::Minimal);
        assert!(prompt.as_str().contains("see {description} and {resume}"));
    }

    #[test]
    fn test_minimal_shape_lists_four_fields() {
        assert_eq!(
            FieldSet::Minimal.json_shape(),
            r#"{"Job Description Match":"%","Missing Keywords":"","Candidate Summary":"","Experience":""}"#
        );
    }

    #[test]
    fn test_extended_shape_marks_match_with_percent() {
        let shape = FieldSet::Extended.json_shape();
        assert!(shape.starts_with(r#"{"Match":"%","Suitability":"""#));
        assert!(shape.ends_with(r#""Missing Keywords":""}"#));
        assert_eq!(shape.matches("\":\"").count(), FieldSet::Extended.fields().len());
    }

    #[test]
    fn test_prompt_requests_the_configured_shape() {
        let request = EvaluationRequest::new("r", "d");
        let prompt = build_prompt(&request, FieldSet::Extended);
        assert!(prompt.as_str().contains(&FieldSet::Extended.json_shape()));
        assert!(!prompt.as_str().contains("Job Description Match"));
    }

    #[test]
    fn test_match_field_is_part_of_field_list() {
        for set in [FieldSet::Minimal, FieldSet::Extended] {
            assert!(set.fields().contains(&set.match_field()));
        }
    }

    #[test]
    fn test_field_set_from_str() {
        assert_eq!("Extended".parse::<FieldSet>().unwrap(), FieldSet::Extended);
        assert_eq!(" minimal ".parse::<FieldSet>().unwrap(), FieldSet::Minimal);
        assert!("full".parse::<FieldSet>().is_err());
    }
}
