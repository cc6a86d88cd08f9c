//! Classifies a transport result into an `Outcome`.
//!
//! # Design
//! Three sources of failure are reconciled here, in order of precedence:
//! 1. the transport never completed an exchange;
//! 2. the body carries an `error` key (the service sometimes does this with
//!    a 200, e.g. when a signing key is already unlocked);
//! 3. the status code is outside the success set.
//!
//! The body is decoded as JSON once. A body that is not JSON is treated as
//! absent rather than as an error of its own.

use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;
use crate::http::HttpResponse;
use crate::outcome::Outcome;

/// What a transport hands back: a completed exchange or its own failure.
pub type TransportResult = Result<HttpResponse, TransportError>;

/// Status codes the service uses for success.
pub const SUCCESS_CODES: [u16; 4] = [200, 201, 202, 302];

/// Narrower success set used by older deployments of the service.
pub const LEGACY_SUCCESS_CODES: [u16; 2] = [200, 302];

const KEY_VALUE_SEPARATOR: &str = " - ";
const PAIR_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseInterpreter {
    success_codes: Vec<u16>,
}

impl Default for ResponseInterpreter {
    fn default() -> Self {
        Self::new(SUCCESS_CODES)
    }
}

impl ResponseInterpreter {
    pub fn new(success_codes: impl Into<Vec<u16>>) -> Self {
        Self {
            success_codes: success_codes.into(),
        }
    }

    pub fn success_codes(&self) -> &[u16] {
        &self.success_codes
    }

    pub fn is_success_status(&self, status: u16) -> bool {
        self.success_codes.contains(&status)
    }

    /// Normalize one transport result. Pure: the same input always yields
    /// the same `Outcome`.
    pub fn interpret(&self, result: &TransportResult) -> Outcome {
        let response = match result {
            Ok(response) => response,
            Err(err) => {
                debug!(error = %err, "transport failed");
                return Outcome::Failure(err.message().to_string());
            }
        };

        let status_ok = self.is_success_status(response.status);
        let payload = serde_json::from_slice::<Value>(&response.body).ok();

        if let Some(message) = payload.as_ref().and_then(embedded_error) {
            debug!(status = response.status, %message, "error reported in body");
            return Outcome::Failure(message);
        }

        if !status_ok {
            debug!(status = response.status, "unsuccessful status");
            return Outcome::Failure(format!("request failed with status {}", response.status));
        }

        Outcome::Success(payload.unwrap_or(Value::Null))
    }
}

/// The flattened `error` entry of a decoded body, if it carries one.
fn embedded_error(payload: &Value) -> Option<String> {
    payload
        .get("error")
        .filter(|value| !is_blank(value))
        .map(flatten_error)
}

/// The service treats `"0"` like `0`, so both count as no error.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Render an error value as one line.
///
/// Mappings become `key - value` pairs joined by `; ` in document order.
/// Lists are treated as mappings keyed by index. Only one level is
/// flattened: nested values are rendered as compact JSON.
pub fn flatten_error(value: &Value) -> String {
    match value {
        Value::Object(map) => join_pairs(map.iter().map(|(k, v)| (k.clone(), v))),
        Value::Array(items) => join_pairs(items.iter().enumerate().map(|(i, v)| (i.to_string(), v))),
        other => scalar_text(other),
    }
}

fn join_pairs<'a>(pairs: impl Iterator<Item = (String, &'a Value)>) -> String {
    pairs
        .map(|(key, value)| format!("{key}{KEY_VALUE_SEPARATOR}{}", scalar_text(value)))
        .collect::<Vec<_>>()
        .join(PAIR_SEPARATOR)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
