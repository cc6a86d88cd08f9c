//! The normalized result of one request cycle.

use serde_json::Value;

use crate::error::BuildError;

/// Either the decoded response payload or one human-readable error message.
///
/// Local build failures, transport failures, unsuccessful status codes and
/// errors embedded in an otherwise successful response all end up as
/// `Failure`; callers tell them apart by message only.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// The failure message, or an empty string for a success.
    pub fn error(&self) -> &str {
        match self {
            Outcome::Success(_) => "",
            Outcome::Failure(message) => message,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Outcome::Success(payload) => Some(payload),
            Outcome::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self {
            Outcome::Success(payload) => Ok(payload),
            Outcome::Failure(message) => Err(message),
        }
    }
}

impl From<BuildError> for Outcome {
    fn from(err: BuildError) -> Self {
        Outcome::Failure(err.to_string())
    }
}
