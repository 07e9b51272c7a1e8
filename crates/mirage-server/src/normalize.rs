//! Merges path, query and body inputs into one request object.
//!
//! Sources are applied in order (path, then query, then body) and later
//! sources overwrite earlier ones on key collision.

use crate::error::ServerError;
use mirage_core::HttpMethod;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Raw request inputs.
#[derive(Debug, Clone, Copy)]
pub struct RawRequest<'a> {
    pub method: HttpMethod,
    pub query: Option<&'a str>,
    pub content_type: Option<&'a str>,
    pub body: &'a [u8],
}

/// Build the merged input for a request.
pub fn normalize(
    path_params: &BTreeMap<String, String>,
    raw: RawRequest<'_>,
) -> Result<Map<String, Value>, ServerError> {
    let mut merged = Map::new();

    for (key, value) in path_params {
        merged.insert(key.clone(), Value::String(value.clone()));
    }

    if let Some(query) = raw.query {
        merged.extend(parse_query(query));
    }

    if raw.method.carries_body() {
        merged.extend(parse_body(raw.body, raw.content_type)?);
    }

    Ok(merged)
}

/// Parse a query string, coercing single values to numbers where they look
/// like one. Repeated keys keep every value as a string list.
pub fn parse_query(query: &str) -> Map<String, Value> {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        grouped
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }

    grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                coerce_scalar(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect()
}

/// Integer, then float, then string.
pub fn coerce_scalar(value: String) -> Value {
    if is_integer(&value)
        && let Ok(n) = value.parse::<i64>()
    {
        return Value::from(n);
    }

    if is_decimal(&value)
        && let Ok(f) = value.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
    {
        return Value::Number(n);
    }

    Value::String(value)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn unsigned(s: &str) -> &str {
    s.strip_prefix(['+', '-']).unwrap_or(s)
}

fn is_integer(s: &str) -> bool {
    all_digits(unsigned(s))
}

fn is_decimal(s: &str) -> bool {
    match unsigned(s).split_once('.') {
        Some((whole, frac)) => all_digits(whole) && all_digits(frac),
        None => false,
    }
}

/// Body parsing strategies, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyStrategy {
    /// Declared JSON, or undeclared with a body that opens an object.
    Json,
    /// Declared form encoding.
    Form,
    /// Anything else that is non-empty: JSON or nothing.
    JsonFallback,
}

const BODY_STRATEGIES: &[BodyStrategy] = &[
    BodyStrategy::Json,
    BodyStrategy::Form,
    BodyStrategy::JsonFallback,
];

impl BodyStrategy {
    fn applies(self, text: &str, content_type: Option<&str>) -> bool {
        match self {
            BodyStrategy::Json => match content_type {
                Some(ct) => ct.contains("json"),
                None => text.trim_start().starts_with('{'),
            },
            BodyStrategy::Form => {
                content_type.is_some_and(|ct| ct.contains("x-www-form-urlencoded"))
            }
            BodyStrategy::JsonFallback => !text.trim().is_empty(),
        }
    }

    fn parse(self, text: &str) -> Result<Map<String, Value>, ServerError> {
        match self {
            BodyStrategy::Json => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(fields)) => Ok(fields),
                Ok(other) => Err(ServerError::InvalidBodyFormat(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                ))),
                Err(e) => Err(ServerError::InvalidJson(e.to_string())),
            },
            BodyStrategy::Form => Ok(text
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .map(|(key, value)| (key.to_string(), Value::String(value.to_string())))
                .collect()),
            BodyStrategy::JsonFallback => match serde_json::from_str::<Value>(text) {
                Ok(Value::Object(fields)) => Ok(fields),
                Ok(other) => Err(ServerError::InvalidBodyFormat(format!(
                    "expected a JSON object, got {}",
                    json_kind(&other)
                ))),
                Err(e) => Err(ServerError::InvalidBodyFormat(e.to_string())),
            },
        }
    }
}

fn parse_body(body: &[u8], content_type: Option<&str>) -> Result<Map<String, Value>, ServerError> {
    let text = std::str::from_utf8(body)
        .map_err(|e| ServerError::InvalidBodyFormat(format!("body is not UTF-8: {}", e)))?;

    if text.trim().is_empty() {
        return Ok(Map::new());
    }

    let content_type = content_type
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty());

    for strategy in BODY_STRATEGIES {
        if strategy.applies(text, content_type.as_deref()) {
            return strategy.parse(text);
        }
    }

    Ok(Map::new())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
