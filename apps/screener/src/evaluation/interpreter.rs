//! Response Interpreter: turns the model's semi-structured reply into named fields,
//! a match percentage and a verdict.
//!
//! Two strategies, chosen per deployment via `ATS_PARSE_STRATEGY`:
//! - `Strict`: the whole reply (minus markdown fences) must be a JSON object.
//! - `Lenient`: each field is located independently with a small grammar:
//!   `"<Field>"` ws `:` ws `"` value `"`, where the value ends at the first
//!   unescaped quote. Bare scalars (`"Match": 75`) are accepted up to `,` `}` or
//!   end of line, and a flat list is joined with ", ". A field that cannot be read
//!   fails alone.
//!
//! Both strategies flatten list values the same way.
//!
//! `interpret` never fails; problems are reported on the returned `Interpretation`.

use std::fmt;
use std::str::{CharIndices, FromStr};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::evaluation::prompts::FieldSet;

/// Fixed pass mark. Not configurable.
pub const MATCH_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseStrategy {
    Strict,
    #[default]
    Lenient,
}

impl fmt::Display for ParseStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseStrategy::Strict => write!(f, "strict"),
            ParseStrategy::Lenient => write!(f, "lenient"),
        }
    }
}

impl FromStr for ParseStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ParseStrategy::Strict),
            "lenient" => Ok(ParseStrategy::Lenient),
            other => Err(format!(
                "unknown parse strategy '{other}' (expected 'strict' or 'lenient')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpretationError {
    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response JSON is not an object")]
    NotAnObject,

    #[error("field '{0}' not found in response")]
    MissingField(String),

    #[error("value of field '{0}' is not terminated")]
    Unterminated(String),

    #[error("field '{0}' has no usable value")]
    EmptyValue(String),

    #[error("value of field '{0}' is not text")]
    NotText(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: String,
}

/// Field name → value, in field-set order. May be partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EvaluationResult {
    fields: Vec<ExtractedField>,
}

impl EvaluationResult {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }

    pub fn fields(&self) -> &[ExtractedField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: &str, value: String) {
        self.fields.push(ExtractedField {
            name: name.to_string(),
            value,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldFailure {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    GoodMatch,
    NotAMatch,
}

impl Verdict {
    /// `>= 60` is a good match; the boundary is inclusive.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= MATCH_THRESHOLD {
            Verdict::GoodMatch
        } else {
            Verdict::NotAMatch
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::GoodMatch => "Candidate is a good match for the position.",
            Verdict::NotAMatch => "Candidate is not a match.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpretationStatus {
    Complete,
    Partial,
    Uninterpretable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interpretation {
    pub status: InterpretationStatus,
    pub fields: EvaluationResult,
    pub failures: Vec<FieldFailure>,
    pub warnings: Vec<String>,
    pub match_percentage: f64,
    pub verdict: Verdict,
}

impl Interpretation {
    pub fn could_not_interpret(&self) -> bool {
        self.status == InterpretationStatus::Uninterpretable
    }
}

/// Interprets a raw model reply. Always returns; degraded results carry warnings.
pub fn interpret(raw: &str, field_set: FieldSet, strategy: ParseStrategy) -> Interpretation {
    let names = field_set.fields();
    let mut warnings = Vec::new();

    let (fields, failures) = match strategy {
        ParseStrategy::Lenient => parse_lenient(raw, names),
        ParseStrategy::Strict => match parse_strict(raw, names) {
            Ok(parsed) => parsed,
            Err(e) => {
                warnings.push(format!("Could not interpret response: {e}"));
                let failures = names
                    .iter()
                    .map(|name| FieldFailure {
                        field: name.to_string(),
                        reason: e.to_string(),
                    })
                    .collect();
                (EvaluationResult::default(), failures)
            }
        },
    };

    let match_field = field_set.match_field();
    let match_percentage = match fields.get(match_field) {
        Some(value) => match parse_match_percentage(value) {
            Ok(pct) => pct,
            Err(e) => {
                warnings.push(format!("{e}; treating match as 0%"));
                0.0
            }
        },
        None => {
            warnings.push(format!(
                "Field '{match_field}' is missing; treating match as 0%"
            ));
            0.0
        }
    };

    let status = if fields.is_empty() {
        InterpretationStatus::Uninterpretable
    } else if failures.is_empty() {
        InterpretationStatus::Complete
    } else {
        InterpretationStatus::Partial
    };

    if status != InterpretationStatus::Complete {
        warn!(
            "Response interpreted as {:?}: {} of {} fields failed",
            status,
            failures.len(),
            names.len()
        );
    }

    Interpretation {
        status,
        fields,
        failures,
        warnings,
        match_percentage,
        verdict: Verdict::from_percentage(match_percentage),
    }
}

/// Parses a match value such as `"75%"`, `" 82.5 % "` or `"60"`.
pub fn parse_match_percentage(value: &str) -> Result<f64, String> {
    let trimmed = value.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    number
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("Match value '{value}' is not a percentage"))
}

// ────────────────────────────────────────────────────────────────────────────
// Strict
// ────────────────────────────────────────────────────────────────────────────

fn parse_strict(
    raw: &str,
    names: &[&str],
) -> Result<(EvaluationResult, Vec<FieldFailure>), InterpretationError> {
    let value: Value = serde_json::from_str(strip_json_fences(raw))
        .map_err(|e| InterpretationError::InvalidJson(e.to_string()))?;
    let object = value.as_object().ok_or(InterpretationError::NotAnObject)?;

    let mut fields = EvaluationResult::default();
    let mut failures = Vec::new();

    for name in names {
        let outcome = match object.get(*name) {
            None => Err(InterpretationError::MissingField(name.to_string())),
            Some(v) => field_text(v, name),
        };
        match outcome {
            Ok(text) => fields.push(name, text),
            Err(e) => failures.push(FieldFailure {
                field: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    Ok((fields, failures))
}

/// Flattens a field value into display text. Lists are joined with ", " and
/// their nulls skipped; objects and nested lists are not text.
fn field_text(value: &Value, name: &str) -> Result<String, InterpretationError> {
    let scalar = |v: &Value| match v {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Array(_) | Value::Object(_) => Err(InterpretationError::NotText(name.to_string())),
        other => Ok(Some(other.to_string())),
    };

    let text = match value {
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.extend(scalar(item)?);
            }
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => scalar(other)?,
    };
    text.ok_or_else(|| InterpretationError::EmptyValue(name.to_string()))
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Lenient
// ────────────────────────────────────────────────────────────────────────────

fn parse_lenient(raw: &str, names: &[&str]) -> (EvaluationResult, Vec<FieldFailure>) {
    let mut fields = EvaluationResult::default();
    let mut failures = Vec::new();

    for name in names {
        match find_field_value(raw, name) {
            Ok(value) => fields.push(name, value),
            Err(e) => failures.push(FieldFailure {
                field: name.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    (fields, failures)
}

/// Finds the first `"<field>"` marker followed by `:` and returns its value.
pub fn find_field_value(raw: &str, field: &str) -> Result<String, InterpretationError> {
    let marker = format!("\"{field}\"");
    let mut from = 0;

    while let Some(pos) = raw[from..].find(&marker) {
        let after_marker = from + pos + marker.len();
        from = after_marker;

        let Some(rest) = raw[after_marker..].trim_start().strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim_start();

        if let Some(quoted) = rest.strip_prefix('"') {
            return capture_quoted(quoted)
                .map(|(value, _)| value)
                .ok_or_else(|| InterpretationError::Unterminated(field.to_string()));
        }

        if let Some(list) = rest.strip_prefix('[') {
            let items = capture_list(list, field)?;
            if items.is_empty() {
                return Err(InterpretationError::EmptyValue(field.to_string()));
            }
            return Ok(items.join(", "));
        }

        if rest.starts_with('{') {
            return Err(InterpretationError::NotText(field.to_string()));
        }

        let bare = rest
            .split(|c: char| c == ',' || c == '}' || c == '\n')
            .next()
            .unwrap_or("")
            .trim();
        if bare.is_empty() || bare == "null" {
            return Err(InterpretationError::EmptyValue(field.to_string()));
        }
        return Ok(bare.to_string());
    }

    Err(InterpretationError::MissingField(field.to_string()))
}

/// Reads a flat `[...]` list of strings or scalars up to its closing `]`.
/// Nulls are skipped; nested lists or objects are not text.
fn capture_list(input: &str, field: &str) -> Result<Vec<String>, InterpretationError> {
    let unterminated = || InterpretationError::Unterminated(field.to_string());
    let mut items = Vec::new();
    let mut rest = input;

    loop {
        rest = rest.trim_start();
        if rest.starts_with(']') {
            return Ok(items);
        }
        if let Some(after) = rest.strip_prefix(',') {
            rest = after;
            continue;
        }
        if rest.starts_with('[') || rest.starts_with('{') {
            return Err(InterpretationError::NotText(field.to_string()));
        }
        if let Some(quoted) = rest.strip_prefix('"') {
            let (item, used) = capture_quoted(quoted).ok_or_else(unterminated)?;
            items.push(item);
            rest = &quoted[used..];
            continue;
        }

        let end = rest.find([',', ']']).ok_or_else(unterminated)?;
        let item = rest[..end].trim();
        if item != "null" {
            items.push(item.to_string());
        }
        rest = &rest[end..];
    }
}

/// Captures text up to the next unescaped `"`, decoding JSON escapes.
/// Returns the text and the number of bytes consumed including the closing
/// quote, or `None` if the closing quote never appears.
fn capture_quoted(input: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut chars = input.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, i + 1)),
            '\\' => match chars.next()?.1 {
                '"' => out.push('"'),
                '\\' => out.push('\\'),
                '/' => out.push('/'),
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                'u' => decode_unicode_escape(&mut chars, &mut out),
                other => {
                    out.push('\\');
                    out.push(other);
                }
            },
            _ => out.push(c),
        }
    }

    None
}

/// Decodes the four hex digits after `\u`, joining a UTF-16 surrogate pair
/// when a low surrogate escape follows. Undecodable escapes are kept literally.
fn decode_unicode_escape(chars: &mut CharIndices<'_>, out: &mut String) {
    let (hex, unit) = read_hex4(chars);
    let Some(unit) = unit else {
        out.push_str("\\u");
        out.push_str(&hex);
        return;
    };

    if (0xD800..0xDC00).contains(&unit) {
        let mut lookahead = chars.clone();
        if let (Some((_, '\\')), Some((_, 'u'))) = (lookahead.next(), lookahead.next()) {
            if let (_, Some(low @ 0xDC00..=0xDFFF)) = read_hex4(&mut lookahead) {
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                if let Some(decoded) = char::from_u32(combined) {
                    out.push(decoded);
                    *chars = lookahead;
                    return;
                }
            }
        }
    }

    match char::from_u32(unit) {
        Some(decoded) => out.push(decoded),
        None => {
            out.push_str("\\u");
            out.push_str(&hex);
        }
    }
}

fn read_hex4(chars: &mut CharIndices<'_>) -> (String, Option<u32>) {
    let hex: String = chars.by_ref().take(4).map(|(_, c)| c).collect();
    let unit = if hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        u32::from_str_radix(&hex, 16).ok()
    } else {
        None
    };
    (hex, unit)
}
