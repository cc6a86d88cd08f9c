//! The seam between request construction and the network.
//!
//! # Design
//! The core never opens sockets itself. A `Transport` receives a finished
//! `RequestDescriptor` and returns either the raw HTTP exchange or its own
//! failure. Exactly one attempt is made per call; retries, pooling and
//! caching are not done here.
//!
//! Closures implement `Transport`, which keeps test doubles to one line.
//! `UreqTransport` is the default blocking implementation.

use crate::error::TransportError;
use crate::http::{HttpResponse, RequestDescriptor};

/// Executes one HTTP exchange.
pub trait Transport {
    fn execute(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&RequestDescriptor) -> Result<HttpResponse, TransportError>,
{
    fn execute(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use std::time::Duration;

    use tracing::debug;
    use ureq::typestate::{WithBody, WithoutBody};
    use ureq::unversioned::multipart::{Form, Part};
    use ureq::{Agent, RequestBuilder};

    use super::Transport;
    use crate::error::TransportError;
    use crate::http::{BodyPlan, HttpMethod, HttpResponse, RequestDescriptor, DATA_FIELD};

    /// `User-Agent` sent with every request.
    pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), '/', env!("CARGO_PKG_VERSION"));

    /// Blocking transport backed by a `ureq` agent.
    ///
    /// Status codes are returned as data and redirects are not followed: a
    /// `302` from the service is an answer, not an instruction. Bodies are
    /// encoded as a `ureq` multipart form, which also sets the boundary in
    /// the `Content-Type` header.
    #[derive(Debug, Clone)]
    pub struct UreqTransport {
        agent: Agent,
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl UreqTransport {
        pub fn new() -> Self {
            Self::with_timeout(None)
        }

        /// Abort any exchange that takes longer than `timeout` in total.
        pub fn with_timeout(timeout: Option<Duration>) -> Self {
            let agent = Agent::config_builder()
                .http_status_as_error(false)
                .max_redirects(0)
                .max_redirects_will_error(false)
                .user_agent(USER_AGENT)
                .timeout_global(timeout)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Use a caller-configured agent. It should not treat HTTP status
        /// codes as errors, otherwise service error bodies are lost.
        pub fn with_agent(agent: Agent) -> Self {
            Self { agent }
        }

        fn without_body(
            &self,
            builder: RequestBuilder<WithoutBody>,
            request: &RequestDescriptor,
        ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
            match &request.body {
                Some(plan) => apply_headers(builder.force_send_body(), request).send(multipart_form(plan)?),
                None => apply_headers(builder, request).call(),
            }
        }

        fn with_body(
            &self,
            builder: RequestBuilder<WithBody>,
            request: &RequestDescriptor,
        ) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
            match &request.body {
                Some(plan) => apply_headers(builder, request).send(multipart_form(plan)?),
                None => apply_headers(builder, request).send_empty(),
            }
        }
    }

    /// File parts first, then the JSON `data` field.
    pub(crate) fn multipart_form(plan: &BodyPlan) -> Result<Form<'_>, ureq::Error> {
        let mut form = Form::new();
        for file in &plan.files {
            let part = Part::bytes(&file.content)
                .file_name(&file.file_name)
                .mime_str(&file.content_type)?;
            form = form.part(&file.name, part);
        }
        if let Some(data) = &plan.data {
            form = form.text(DATA_FIELD, data);
        }
        Ok(form)
    }

    fn apply_headers<B>(mut builder: RequestBuilder<B>, request: &RequestDescriptor) -> RequestBuilder<B> {
        // The form supplies its own content type, boundary included.
        let headers = request
            .headers
            .iter()
            .filter(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(auth) = &request.basic_auth {
            builder = builder.header("authorization", auth.authorization_header());
        }
        builder
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: &RequestDescriptor) -> Result<HttpResponse, TransportError> {
            let url = request.url.as_str();
            let result = match request.method {
                HttpMethod::Get => self.without_body(self.agent.get(url), request),
                HttpMethod::Delete => self.without_body(self.agent.delete(url), request),
                HttpMethod::Post => self.with_body(self.agent.post(url), request),
                HttpMethod::Put => self.with_body(self.agent.put(url), request),
            };
            let mut response = result.map_err(|e| TransportError::new(e.to_string()))?;

            let status = response.status().as_u16();
            let headers = response
                .headers()
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect();
            let body = response
                .body_mut()
                .read_to_vec()
                .map_err(|e| TransportError::new(e.to_string()))?;

            debug!(method = %request.method, status, bytes = body.len(), "exchange completed");
            Ok(HttpResponse { status, headers, body })
        }
    }
}
