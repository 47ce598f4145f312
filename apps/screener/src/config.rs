use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::evaluation::interpreter::ParseStrategy;
use crate::evaluation::prompts::FieldSet;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-1.5-pro";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(String),

    #[error("Environment variable '{key}' has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
/// Fails at startup if the API credential is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_api_base: String,
    pub gemini_model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
    pub llm_timeout: Duration,
    pub field_set: FieldSet,
    pub parse_strategy: ParseStrategy,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` delegates here.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let google_api_key = lookup("GOOGLE_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::Missing("GOOGLE_API_KEY".to_string()))?;

        Ok(Config {
            google_api_key,
            gemini_api_base: lookup("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&lookup, "GEMINI_TEMPERATURE", 0.4)?,
            top_p: parse_or(&lookup, "GEMINI_TOP_P", 1.0)?,
            top_k: parse_or(&lookup, "GEMINI_TOP_K", 32)?,
            max_output_tokens: parse_or(&lookup, "GEMINI_MAX_OUTPUT_TOKENS", 4096)?,
            llm_timeout: Duration::from_secs(parse_or(&lookup, "LLM_TIMEOUT_SECS", 60)?),
            field_set: parse_or(&lookup, "ATS_FIELD_SET", FieldSet::Minimal)?,
            parse_strategy: parse_or(&lookup, "ATS_PARSE_STRATEGY", ParseStrategy::Lenient)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Upload limit in the largest whole unit, e.g. "10 MB", "1.5 MB" or "512 KB".
    pub fn upload_limit_label(&self) -> String {
        const KIB: usize = 1024;
        const MIB: usize = 1024 * KIB;

        let bytes = self.max_upload_bytes;
        if bytes >= MIB && bytes % MIB == 0 {
            format!("{} MB", bytes / MIB)
        } else if bytes >= MIB {
            format!("{:.1} MB", bytes as f64 / MIB as f64)
        } else if bytes >= KIB {
            format!("{} KB", bytes / KIB)
        } else {
            format!("{bytes} bytes")
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
