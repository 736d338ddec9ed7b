//! Strict conversion of loosely structured agent output into findings.
//!
//! Agents backed by an LLM or an external service answer with JSON, often
//! wrapped in prose or a code fence. This is the only place such output
//! becomes [`Finding`]s. Any element that does not validate rejects the whole
//! output as [`AgentErrorKind::MalformedOutput`](super::AgentErrorKind).

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::{Category, Finding, Severity, Span};

use super::error::{AgentError, AgentResult};

pub const DEFAULT_SEVERITY: Severity = Severity::Warning;
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

fn array_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"))
}

/// Who produced the output and what it is checked against.
#[derive(Debug, Clone, Copy)]
pub struct ParseContext<'a> {
    pub agent_id: &'a str,
    pub default_category: Category,
    pub text_len: usize,
}

impl<'a> ParseContext<'a> {
    pub fn new(agent_id: &'a str, default_category: Category, text_len: usize) -> Self {
        Self {
            agent_id,
            default_category,
            text_len,
        }
    }

    fn malformed(&self, detail: impl Into<String>) -> AgentError {
        AgentError::malformed(self.agent_id, detail)
    }
}

/// Extract the first JSON array embedded in free text and parse it.
pub fn parse_findings_text(raw: &str, ctx: &ParseContext<'_>) -> AgentResult<Vec<Finding>> {
    let block = array_re()
        .find(raw)
        .ok_or_else(|| ctx.malformed("no JSON array in agent output"))?;
    let value: Value = serde_json::from_str(block.as_str())
        .map_err(|e| ctx.malformed(format!("invalid JSON array: {e}")))?;
    parse_findings(&value, ctx)
}

/// Convert a JSON array of finding objects.
pub fn parse_findings(value: &Value, ctx: &ParseContext<'_>) -> AgentResult<Vec<Finding>> {
    let items = value
        .as_array()
        .ok_or_else(|| ctx.malformed("expected a JSON array of findings"))?;
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            parse_one(item, ctx).map_err(|detail| ctx.malformed(format!("finding {idx}: {detail}")))
        })
        .collect()
}

fn parse_one(item: &Value, ctx: &ParseContext<'_>) -> Result<Finding, String> {
    let obj = item.as_object().ok_or("expected an object")?;

    let start = required_offset(obj, "start")?;
    let end = required_offset(obj, "end")?;
    let message = match obj.get("message") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err("`message` must be a string".to_string()),
        None => return Err("missing field `message`".to_string()),
    };

    let category = match optional_str(obj, "category")? {
        Some(s) => s.parse::<Category>().map_err(|e| e.to_string())?,
        None => ctx.default_category,
    };
    let severity = match optional_str(obj, "severity")? {
        Some(s) => s.parse::<Severity>().map_err(|e| e.to_string())?,
        None => DEFAULT_SEVERITY,
    };
    let confidence = match obj.get("confidence") {
        None | Some(Value::Null) => DEFAULT_CONFIDENCE,
        Some(v) => v.as_f64().ok_or("`confidence` must be a number")?,
    };
    let suggestion = optional_str(obj, "suggestion")?;

    let span = Span::new(start, end, ctx.text_len).map_err(|e| e.to_string())?;
    let finding = Finding::new(span, category, message, severity, confidence, ctx.agent_id)
        .map_err(|e| e.to_string())?;
    Ok(match suggestion {
        Some(s) => finding.with_suggestion(s),
        None => finding,
    })
}

fn required_offset(obj: &Map<String, Value>, field: &str) -> Result<usize, String> {
    let value = obj
        .get(field)
        .ok_or_else(|| format!("missing field `{field}`"))?;
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| format!("`{field}` must be a non-negative integer"))
}

fn optional_str<'v>(obj: &'v Map<String, Value>, field: &str) -> Result<Option<&'v str>, String> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(format!("`{field}` must be a string")),
    }
}
