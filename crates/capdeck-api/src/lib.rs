// capdeck-api: Async Rust client for the remote agent REST API
//
// Stateless request layer: every call takes an `Endpoint` describing the
// base URL and the Authorization header to send, so the caller decides
// where and as whom each request goes.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

mod events;
mod files;
mod session;

pub use auth::BasicCredentials;
pub use client::{AgentClient, Endpoint};
pub use error::Error;
pub use models::{Caplet, CommandRequest, CommandResponse, Environment, Event, Module, Session};
pub use transport::{TlsMode, TransportConfig};
