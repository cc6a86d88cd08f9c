//! Client core for the PhoneGap Build REST API.
//!
//! # Overview
//! Maps logical operations (resource path, verb, parameters) onto HTTP
//! requests, and maps whatever comes back (transport failure, status code,
//! JSON body with or without an embedded `error`) onto a single `Outcome`.
//!
//! # Design
//! - `RequestBuilder` produces `RequestDescriptor` values; `ResponseInterpreter`
//!   consumes `HttpResponse` values. Neither touches the network.
//! - A `Transport` performs the exchange in between. `UreqTransport` is the
//!   blocking default; closures work as test doubles.
//! - `BuildClient` ties the pieces to a set of `Credentials` and returns an
//!   `Outcome` from every request.
//! - `resources` lists the service's operations as plain `Operation`
//!   constructors.

pub mod auth;
pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod interpret;
pub mod outcome;
pub mod resources;
pub mod transport;
pub mod types;

pub use auth::Credentials;
pub use builder::RequestBuilder;
pub use client::BuildClient;
pub use config::ClientConfig;
pub use error::{BuildError, TransportError};
pub use http::{BasicAuth, BodyPlan, FilePart, HttpMethod, HttpResponse, RequestDescriptor};
pub use interpret::{flatten_error, ResponseInterpreter, TransportResult};
pub use outcome::Outcome;
pub use resources::{Platform, Role};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Operation, ParamValue, Params};
