//! HTML views. Values are escaped by askama; nothing from the model is trusted.

use askama::Template;
use axum::response::Html;

use crate::errors::AppError;
use crate::evaluation::interpreter::{FieldFailure, Verdict};
use crate::evaluation::pipeline::EvaluationReport;

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub field_set: String,
    pub upload_limit: String,
}

pub struct FieldView {
    pub heading: String,
    pub value: String,
}

#[derive(Template)]
#[template(path = "result.html")]
pub struct ResultPage {
    pub evaluation_id: String,
    pub could_not_interpret: bool,
    pub match_label: String,
    pub fields: Vec<FieldView>,
    pub failures: Vec<FieldFailure>,
    pub warnings: Vec<String>,
    pub good_match: bool,
    pub verdict: String,
    pub highlighted_experience: Option<String>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status: u16,
    pub message: String,
}

impl ResultPage {
    pub fn from_report(report: &EvaluationReport) -> Self {
        let interpretation = &report.interpretation;
        let match_field = report.field_set.match_field();

        let match_label = format!("{}%", interpretation.match_percentage);

        let fields = interpretation
            .fields
            .fields()
            .iter()
            .filter(|f| f.name != match_field)
            .map(|f| FieldView {
                heading: heading_for(&f.name),
                value: f.value.clone(),
            })
            .collect();

        let good_match = interpretation.verdict == Verdict::GoodMatch;
        let highlighted_experience = if good_match {
            interpretation.fields.get("Experience").map(str::to_string)
        } else {
            None
        };

        Self {
            evaluation_id: report.evaluation_id.to_string(),
            could_not_interpret: interpretation.could_not_interpret(),
            match_label,
            fields,
            failures: interpretation.failures.clone(),
            warnings: interpretation.warnings.clone(),
            good_match,
            verdict: interpretation.verdict.message().to_string(),
            highlighted_experience,
        }
    }
}

fn heading_for(field: &str) -> String {
    match field {
        "Missing Keywords" => "Keywords missing from the resume include:".to_string(),
        "Candidate Summary" | "Summary" => "Here’s a summary of the candidate:".to_string(),
        "Experience" => "The candidate’s relevant experience is:".to_string(),
        other => format!("{other}:"),
    }
}

pub fn render<T: Template>(template: &T) -> Result<Html<String>, AppError> {
    template
        .render()
        .map(Html)
        .map_err(|e| AppError::Internal(e.into()))
}
