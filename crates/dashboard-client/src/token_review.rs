//! Username resolution via the Kubernetes TokenReview API
//!
//! When a caller presents a bearer token without impersonation, the gate still
//! needs a username to check cluster access against. The control plane's
//! TokenReview API tells us who the token belongs to.

use async_trait::async_trait;
use k8s_openapi::api::authentication::v1::{TokenReview, TokenReviewSpec, TokenReviewStatus};
use kube::{Api, Client};
use tracing::debug;

use crate::error::{Error, Result};

/// Resolves the username a bearer token authenticates as
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsernameResolver: Send + Sync {
    /// Username for `token`; `Unauthorized` if the token is not valid
    async fn resolve(&self, token: &str) -> Result<String>;
}

/// Resolver submitting a TokenReview to the control plane
pub struct TokenReviewResolver {
    client: Client,
}

impl TokenReviewResolver {
    /// Resolver using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UsernameResolver for TokenReviewResolver {
    async fn resolve(&self, token: &str) -> Result<String> {
        let api: Api<TokenReview> = Api::all(self.client.clone());

        let review = TokenReview {
            metadata: Default::default(),
            spec: TokenReviewSpec {
                token: Some(token.to_string()),
                audiences: None,
            },
            status: None,
        };

        let result = api.create(&Default::default(), &review).await?;
        let status = result
            .status
            .ok_or_else(|| Error::Construction("TokenReview returned no status".into()))?;

        validate_status(&status)
    }
}

/// Extract the username from a TokenReview status
fn validate_status(status: &TokenReviewStatus) -> Result<String> {
    if !status.authenticated.unwrap_or(false) {
        let msg = status
            .error
            .as_deref()
            .unwrap_or("token authentication failed");
        return Err(Error::Unauthorized(msg.to_string()));
    }

    let username = status
        .user
        .as_ref()
        .and_then(|u| u.username.clone())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::Unauthorized("token review returned no username".into()))?;

    debug!(username = %username, "resolved username via TokenReview");
    Ok(username)
}
