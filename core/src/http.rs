//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! These types describe HTTP requests and responses as plain data. The
//! builder produces `RequestDescriptor` values and the interpreter consumes
//! `HttpResponse` values without either touching the network; a `Transport`
//! executes the exchange in between.
//!
//! The request body is kept as a `BodyPlan` (named file parts plus an
//! optional JSON `data` field) rather than pre-encoded bytes, so tests can
//! inspect what will be sent. The transport owns the wire encoding and the
//! multipart boundary.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::BuildError;

/// Name of the multipart field that carries the JSON-encoded parameters.
pub const DATA_FIELD: &str = "data";

/// Declared content type of every request that carries a body. The transport
/// appends the boundary of the form it encodes.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = BuildError;

    /// Case-insensitive: `"get"`, `"Get"` and `"GET"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(BuildError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// One file attachment in a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Form field name, identical to the logical parameter name.
    pub name: String,
    /// Safe to place in a quoted header parameter: no `"`, CR or LF.
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// What goes into the multipart body: file parts first, then at most one
/// `data` field holding every non-file parameter as a single JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyPlan {
    pub files: Vec<FilePart>,
    pub data: Option<String>,
}

impl BodyPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.data.is_none()
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.iter().find(|f| f.name == name)
    }
}

/// Username/password pair the transport sends using HTTP Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        let raw = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A fully resolved, transport-ready request.
///
/// Built by `RequestBuilder::build`. When token authentication is active the
/// token is already part of `url`; `basic_auth` is only set for
/// username/password authentication.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub basic_auth: Option<BasicAuth>,
    pub body: Option<BodyPlan>,
}

impl RequestDescriptor {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Constructed by the transport after executing a `RequestDescriptor`, then
/// handed to `ResponseInterpreter::interpret`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }
}
