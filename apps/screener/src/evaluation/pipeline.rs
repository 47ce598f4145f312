//! Evaluation pipeline: extract → prompt → generate → interpret.
//!
//! Strictly forward. An extraction failure stops before any prompt is built;
//! a remote failure stops with the diagnostic from `generate_or_diagnose`.
//! Interpretation never fails, it only degrades.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::evaluation::interpreter::{interpret, Interpretation, ParseStrategy};
use crate::evaluation::prompts::{build_prompt, EvaluationRequest, FieldSet};
use crate::extraction::{extract_text, MediaType, ResumeDocument};
use crate::llm_client::fallback::generate_or_diagnose;
use crate::llm_client::TextGenerator;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub evaluation_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub media_type: MediaType,
    pub field_set: FieldSet,
    pub parse_strategy: ParseStrategy,
    #[serde(flatten)]
    pub interpretation: Interpretation,
    pub raw_response: String,
}

/// One pipeline, parameterised by field set and parse strategy.
#[derive(Clone)]
pub struct Evaluator {
    generator: Arc<dyn TextGenerator>,
    field_set: FieldSet,
    strategy: ParseStrategy,
}

impl Evaluator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        field_set: FieldSet,
        strategy: ParseStrategy,
    ) -> Self {
        Self {
            generator,
            field_set,
            strategy,
        }
    }

    pub fn field_set(&self) -> FieldSet {
        self.field_set
    }

    pub fn generator(&self) -> &dyn TextGenerator {
        self.generator.as_ref()
    }

    pub async fn evaluate(
        &self,
        document: ResumeDocument,
        job_description: &str,
    ) -> Result<EvaluationReport, AppError> {
        let evaluation_id = Uuid::new_v4();
        let media_type = document.media_type;

        let resume_text = extract_text(document).await?;
        let request = EvaluationRequest::new(resume_text, job_description);
        let prompt = build_prompt(&request, self.field_set);

        info!(
            %evaluation_id,
            "Evaluating {} resume ({} chars) against job description ({} chars)",
            media_type.label(),
            request.resume_text().len(),
            request.job_description().len()
        );

        let raw_response = generate_or_diagnose(self.generator.as_ref(), prompt.as_str()).await?;
        let interpretation = interpret(&raw_response, self.field_set, self.strategy);

        info!(
            %evaluation_id,
            "Evaluation finished: match={}%, verdict={:?}, status={:?}",
            interpretation.match_percentage,
            interpretation.verdict,
            interpretation.status
        );

        Ok(EvaluationReport {
            evaluation_id,
            evaluated_at: Utc::now(),
            media_type,
            field_set: self.field_set,
            parse_strategy: self.strategy,
            interpretation,
            raw_response,
        })
    }
}
