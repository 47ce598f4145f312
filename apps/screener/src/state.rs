use crate::config::Config;
use crate::evaluation::pipeline::Evaluator;

/// Shared application state injected into all route handlers via Axum extractors.
/// Immutable after startup; requests share nothing mutable.
#[derive(Clone)]
pub struct AppState {
    /// Evaluation pipeline. Holds the model client as `Arc<dyn TextGenerator>`.
    pub evaluator: Evaluator,
    pub config: Config,
}
