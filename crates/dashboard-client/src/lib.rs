//! Multi-cluster client layer for the dashboard API
//!
//! - [`config`] - connection parameters and the bootstrap-once [`ConfigStore`]
//! - [`registry`] - cached clients for the control plane, API server and members
//! - [`authenticator`] - per-request identity from headers or the fallback store
//! - [`gate`] - per-cluster authorization against an [`AccessPolicy`]
//! - [`cedar`] - Cedar implementation of [`AccessPolicy`]
//! - [`scope`] - request cancellation and deadline
//! - [`current_user`] - process-wide user slot (see its hazard note)

#![deny(missing_docs)]

pub mod authenticator;
pub mod cedar;
pub mod config;
pub mod current_user;
pub mod error;
pub mod gate;
pub mod identity;
pub mod registry;
pub mod scope;
pub mod store;
pub mod token_review;

pub use authenticator::RequestAuthenticator;
pub use cedar::CedarAccessPolicy;
pub use config::{BootstrapOptions, ConfigStore, ConnectionConfig, RateLimit};
pub use error::{Error, Result};
pub use gate::{AccessDecision, AccessPolicy, AuthorizationGate, PolicyError};
pub use identity::{extract_bearer_token, AuthIdentity, Impersonation};
pub use registry::{ClientHandle, ClientRegistry, ClientTarget};
pub use scope::RequestScope;
pub use store::{CredentialStore, MemoryCredentialStore, SecretCredentialStore};
pub use token_review::{TokenReviewResolver, UsernameResolver};
