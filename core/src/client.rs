//! Client facade: credentials, one builder, one interpreter, one transport.
//!
//! # Design
//! `BuildClient::request` runs the whole cycle for one `Operation` and
//! returns its `Outcome`. A build failure short-circuits before the
//! transport is touched. The last outcome is kept only to back the
//! `success()` / `error()` convenience accessors; it is cleared when a new
//! request starts and replaced once it finishes.
//!
//! The client takes `&mut self` for requests and has no internal locking.
//! Callers sharing one client across threads must serialize access.

use tracing::{debug, instrument, warn};

use crate::auth::Credentials;
use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::interpret::ResponseInterpreter;
use crate::outcome::Outcome;
use crate::transport::Transport;
use crate::types::Operation;

#[derive(Debug)]
pub struct BuildClient<T> {
    builder: RequestBuilder,
    interpreter: ResponseInterpreter,
    credentials: Option<Credentials>,
    transport: T,
    last: Option<Outcome>,
}

impl<T: Transport> BuildClient<T> {
    pub fn new(config: &ClientConfig, transport: T) -> Self {
        Self {
            builder: RequestBuilder::new(&config.endpoint),
            interpreter: ResponseInterpreter::new(config.success_codes.clone()),
            credentials: None,
            transport,
            last: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Authenticate with an API token. Replaces any username and password.
    pub fn set_token(&mut self, token: impl Into<String>) -> &mut Self {
        self.credentials = Some(Credentials::token(token));
        self
    }

    /// Authenticate with username and password. Replaces any token.
    pub fn set_credentials(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.credentials = Some(Credentials::basic(username, password));
        self
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Perform one operation: build, send once, interpret.
    #[instrument(skip_all, fields(method = %operation.method, path = %operation.uri()))]
    pub fn request(&mut self, operation: Operation) -> Outcome {
        self.last = None;
        let outcome = self.perform(&operation);
        match &outcome {
            Outcome::Success(_) => debug!("request succeeded"),
            Outcome::Failure(message) => warn!(%message, "request failed"),
        }
        self.last = Some(outcome.clone());
        outcome
    }

    fn perform(&self, operation: &Operation) -> Outcome {
        let request = match self.builder.build(operation, self.credentials.as_ref()) {
            Ok(request) => request,
            Err(err) => return err.into(),
        };
        let result = self.transport.execute(&request);
        self.interpreter.interpret(&result)
    }

    /// Outcome of the most recent request, if one has completed.
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last.as_ref()
    }

    /// Whether the most recent request succeeded. `false` before any request.
    pub fn success(&self) -> bool {
        self.last.as_ref().is_some_and(Outcome::is_success)
    }

    /// Error message of the most recent request, empty if it succeeded or
    /// nothing has run yet.
    pub fn error(&self) -> &str {
        self.last.as_ref().map_or("", Outcome::error)
    }
}

#[cfg(feature = "ureq")]
impl BuildClient<crate::transport::UreqTransport> {
    /// Client over the default blocking `ureq` transport.
    pub fn with_ureq(config: &ClientConfig) -> Self {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}
