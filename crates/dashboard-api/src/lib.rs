//! HTTP surface of the multi-cluster dashboard API
//!
//! Routes live under `/api/v1`. Every API route is authenticated; routes under
//! `/api/v1/member/{cluster}` are additionally gated on access to that cluster.

#![deny(missing_docs)]

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod server;
pub mod targets;

pub use error::{Error, Result};
pub use server::{router, start_server, AppState, ServerConfig};
pub use targets::{RegistryTargets, Targets};
