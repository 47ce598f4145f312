//! Failure reporting for evaluation calls.
//!
//! When generation fails the provider is asked once for its model list so an
//! operator can see whether the configured model name is still served. This is
//! a reporting aid only; the evaluation request is never resent.

use std::fmt;

use thiserror::Error;
use tracing::warn;

use super::{LlmError, TextGenerator};

/// Outcome of the model listing made after a failed generation.
#[derive(Debug)]
pub enum AvailableModels {
    Listed(Vec<String>),
    Unavailable(String),
}

impl fmt::Display for AvailableModels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailableModels::Listed(names) if names.is_empty() => write!(f, "[] (none reported)"),
            AvailableModels::Listed(names) => write!(f, "[{}]", names.join(", ")),
            AvailableModels::Unavailable(reason) => write!(f, "Error fetching models: {reason}"),
        }
    }
}

#[derive(Debug, Error)]
#[error("Error generating response: {cause}. Available models: {available_models}")]
pub struct RemoteInvocationError {
    pub cause: LlmError,
    pub available_models: AvailableModels,
}

impl RemoteInvocationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, LlmError::Timeout { .. })
    }

    /// Human-readable diagnostic: the underlying error plus the model listing.
    pub fn diagnostic(&self) -> String {
        self.to_string()
    }
}

/// Runs one generation. On failure, lists available models and returns a diagnostic.
pub async fn generate_or_diagnose(
    generator: &dyn TextGenerator,
    prompt: &str,
) -> Result<String, RemoteInvocationError> {
    match generator.generate(prompt).await {
        Ok(text) => Ok(text),
        Err(cause) => {
            warn!("Evaluation call failed: {cause}; listing available models");
            let available_models = match generator.list_models().await {
                Ok(names) => AvailableModels::Listed(names),
                Err(e) => AvailableModels::Unavailable(e.to_string()),
            };
            Err(RemoteInvocationError {
                cause,
                available_models,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingGenerator {
        models: Result<Vec<String>, String>,
        generate_calls: AtomicUsize,
    }

    impl FailingGenerator {
        fn new(models: Result<Vec<String>, String>) -> Self {
            Self {
                models,
                generate_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            Err(LlmError::Api {
                status: 429,
                message: "Resource has been exhausted (e.g. check quota).".to_string(),
            })
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            self.models.clone().map_err(|message| LlmError::Api {
                status: 500,
                message,
            })
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            Ok(prompt.to_uppercase())
        }

        async fn list_models(&self) -> Result<Vec<String>, LlmError> {
            panic!("listing must not happen on success");
        }
    }

    #[tokio::test]
    async fn test_success_passes_text_through() {
        let text = generate_or_diagnose(&EchoGenerator, "ok").await.unwrap();
        assert_eq!(text, "OK");
    }

    #[tokio::test]
    async fn test_failure_diagnostic_contains_error_and_models() {
        let generator = FailingGenerator::new(Ok(vec![
            "models/gemini-1.5-pro".to_string(),
            "models/gemini-1.5-flash".to_string(),
        ]));
        let err = generate_or_diagnose(&generator, "p").await.unwrap_err();
        let diagnostic = err.diagnostic();
        assert!(diagnostic.starts_with("Error generating response:"));
        assert!(diagnostic.contains("Resource has been exhausted"));
        assert!(diagnostic.contains("[models/gemini-1.5-pro, models/gemini-1.5-flash]"));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let generator = FailingGenerator::new(Ok(vec![]));
        let _ = generate_or_diagnose(&generator, "p").await;
        assert_eq!(generator.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_model_list_is_explicit() {
        let generator = FailingGenerator::new(Ok(vec![]));
        let err = generate_or_diagnose(&generator, "p").await.unwrap_err();
        assert!(err.diagnostic().contains("Available models: [] (none reported)"));
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported_too() {
        let generator = FailingGenerator::new(Err("backend unavailable".to_string()));
        let err = generate_or_diagnose(&generator, "p").await.unwrap_err();
        let diagnostic = err.diagnostic();
        assert!(diagnostic.contains("Error generating response"));
        assert!(diagnostic.contains("Error fetching models"));
        assert!(diagnostic.contains("backend unavailable"));
    }

    #[test]
    fn test_timeout_is_flagged() {
        let err = RemoteInvocationError {
            cause: LlmError::Timeout { secs: 60 },
            available_models: AvailableModels::Listed(vec!["models/gemini-1.5-pro".to_string()]),
        };
        assert!(err.is_timeout());
        assert!(err.diagnostic().contains("timed out after 60s"));
    }
}
