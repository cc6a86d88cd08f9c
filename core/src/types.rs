//! Domain types describing a logical API call.
//!
//! # Design
//! Parameter values are a tagged variant instead of loosely typed strings.
//! A file attachment is a distinct `FileRef` variant that can only be
//! created through `ParamValue::file`, so ordinary text that happens to start
//! with `@` or look like a path is never mistaken for an upload.
//!
//! `Params` is insertion-ordered so the JSON `data` blob lists keys in the
//! order the caller supplied them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Ordered parameter mapping.
pub type Params = IndexMap<String, ParamValue>;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Boolean(bool),
    Number(serde_json::Number),
    Text(String),
    List(Vec<ParamValue>),
    Map(Params),
    /// Local file whose bytes are uploaded as a multipart part. Only
    /// recognised as a top-level parameter; it has no JSON form.
    #[serde(skip)]
    FileRef(PathBuf),
}

impl ParamValue {
    pub fn file(path: impl AsRef<Path>) -> Self {
        ParamValue::FileRef(path.as_ref().to_path_buf())
    }

    pub fn as_file(&self) -> Option<&Path> {
        match self {
            ParamValue::FileRef(path) => Some(path),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Boolean(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Number(value.into())
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<Params> for ParamValue {
    fn from(value: Params) -> Self {
        ParamValue::Map(value)
    }
}

/// Merge `overrides` into `defaults`. Keys already present keep their
/// position and take the overriding value; new keys are appended.
pub fn merge(mut defaults: Params, overrides: Params) -> Params {
    for (key, value) in overrides {
        defaults.insert(key, value);
    }
    defaults
}

/// A logical request: resource path, verb and parameters.
///
/// The method is kept as text until the request is built so an unsupported
/// verb surfaces as a build failure rather than a type error at the call site.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub path: Vec<String>,
    pub method: String,
    pub params: Params,
}

impl Operation {
    pub fn new<I, S>(method: &str, path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self {
            path: path.into_iter().map(|s| s.to_string()).collect(),
            method: method.to_string(),
            params: Params::new(),
        }
    }

    pub fn get<I: IntoIterator<Item = S>, S: ToString>(path: I) -> Self {
        Self::new("GET", path)
    }

    pub fn post<I: IntoIterator<Item = S>, S: ToString>(path: I) -> Self {
        Self::new("POST", path)
    }

    pub fn put<I: IntoIterator<Item = S>, S: ToString>(path: I) -> Self {
        Self::new("PUT", path)
    }

    pub fn delete<I: IntoIterator<Item = S>, S: ToString>(path: I) -> Self {
        Self::new("DELETE", path)
    }

    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Path segments joined with `/`.
    pub fn uri(&self) -> String {
        self.path.join("/")
    }
}
