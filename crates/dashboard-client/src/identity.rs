//! Per-request caller identity
//!
//! An [`AuthIdentity`] is built fresh for every inbound request from its
//! `Authorization` and `Impersonate-*` headers (or from the fallback
//! credential) and dropped with the request. The credential is zeroized on
//! drop and never printed.

use std::collections::BTreeMap;
use std::fmt;

use http::HeaderMap;
use zeroize::Zeroizing;

/// Authorization header name
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Bearer credential prefix
pub const BEARER_PREFIX: &str = "Bearer ";

/// Acting-user impersonation header
pub const IMPERSONATE_USER_HEADER: &str = "Impersonate-User";

/// Acting-group impersonation header (repeatable)
pub const IMPERSONATE_GROUP_HEADER: &str = "Impersonate-Group";

/// Prefix of extra-attribute impersonation headers
pub const IMPERSONATE_EXTRA_PREFIX: &str = "Impersonate-Extra-";

/// Impersonation requested by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Impersonation {
    /// Acting user
    pub user: String,
    /// Acting groups, in header order
    pub groups: Vec<String>,
    /// Extra attributes keyed by canonical header suffix (`Scopes`), values
    /// in header order
    pub extra: BTreeMap<String, Vec<String>>,
}

/// Identity the current request acts as
#[derive(Clone)]
pub struct AuthIdentity {
    token: Zeroizing<String>,
    impersonation: Option<Impersonation>,
    username: Option<String>,
}

impl AuthIdentity {
    /// Identity holding only a credential
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            impersonation: None,
            username: None,
        }
    }

    /// Attach impersonation; the acting user becomes the resolved username
    pub fn with_impersonation(mut self, impersonation: Impersonation) -> Self {
        self.username = Some(impersonation.user.clone());
        self.impersonation = Some(impersonation);
        self
    }

    /// Set the resolved username (used for cluster authorization)
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Bearer credential
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Impersonation, if the caller requested one
    pub fn impersonation(&self) -> Option<&Impersonation> {
        self.impersonation.as_ref()
    }

    /// Username used for authorization decisions, if resolved
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

impl fmt::Debug for AuthIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthIdentity")
            .field("token", &"<redacted>")
            .field("impersonation", &self.impersonation)
            .field("username", &self.username)
            .finish()
    }
}

/// Extract the bearer credential from the Authorization header
///
/// Returns `None` when the header is missing, does not carry the `Bearer `
/// prefix, or has nothing after it.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
        .filter(|t| !t.is_empty())
}

/// Read impersonation headers
///
/// Groups and extras are only honoured alongside an acting user.
pub fn extract_impersonation(headers: &HeaderMap) -> Option<Impersonation> {
    let user = headers
        .get(IMPERSONATE_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|u| !u.is_empty())?
        .to_string();

    let groups = headers
        .get_all(IMPERSONATE_GROUP_HEADER)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(String::from)
        .collect();

    // HeaderMap stores names lowercased
    let extra_prefix = IMPERSONATE_EXTRA_PREFIX.to_ascii_lowercase();
    let mut extra = BTreeMap::new();
    for name in headers.keys() {
        let Some(suffix) = name.as_str().strip_prefix(&extra_prefix) else {
            continue;
        };
        if suffix.is_empty() {
            continue;
        }
        let values: Vec<String> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect();
        extra.insert(canonical_key(suffix), values);
    }

    Some(Impersonation {
        user,
        groups,
        extra,
    })
}

/// Canonical MIME form of a header word: `acme.io-scopes` becomes `Acme.io-Scopes`
fn canonical_key(key: &str) -> String {
    let mut upper = true;
    key.chars()
        .map(|c| {
            let out = if upper { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() };
            upper = c == '-';
            out
        })
        .collect()
}

/// Build an identity from request headers, if they carry a bearer credential
pub fn identity_from_headers(headers: &HeaderMap) -> Option<AuthIdentity> {
    let token = extract_bearer_token(headers)?;
    let identity = AuthIdentity::from_token(token);
    Some(match extract_impersonation(headers) {
        Some(imp) => identity.with_impersonation(imp),
        None => identity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                value.parse().unwrap(),
            );
        }
        map
    }

    #[rstest]
    #[case("Bearer abc123", Some("abc123"))]
    #[case("Bearer a.b.c", Some("a.b.c"))]
    #[case("Bearer ", None)]
    #[case("Basic abc123", None)]
    #[case("bearer abc123", None)]
    #[case("abc123", None)]
    fn test_extract_bearer_token(#[case] header: &str, #[case] expected: Option<&str>) {
        let map = headers(&[("Authorization", header)]);
        assert_eq!(extract_bearer_token(&map), expected);
    }

    #[test]
    fn test_extract_bearer_token_missing() {
        assert_eq!(extract_bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_impersonation_full() {
        let map = headers(&[
            ("Impersonate-User", "alice"),
            ("Impersonate-Group", "devs"),
            ("Impersonate-Group", "ops"),
            ("Impersonate-Extra-Scopes", "view"),
            ("Impersonate-Extra-Scopes", "edit"),
            ("Impersonate-Extra-Reason", "oncall"),
        ]);

        let imp = extract_impersonation(&map).unwrap();
        assert_eq!(imp.user, "alice");
        assert_eq!(imp.groups, vec!["devs", "ops"]);
        assert_eq!(imp.extra["Scopes"], vec!["view", "edit"]);
        assert_eq!(imp.extra["Reason"], vec!["oncall"]);
    }

    #[rstest]
    #[case("impersonate-extra-scopes", "Scopes")]
    #[case("Impersonate-Extra-ACME.IO-team-ID", "Acme.io-Team-Id")]
    #[case("impersonate-extra-reason-", "Reason-")]
    fn test_impersonation_extra_keys_are_canonical(#[case] header: &str, #[case] key: &str) {
        let map = headers(&[("Impersonate-User", "alice"), (header, "x")]);
        let imp = extract_impersonation(&map).unwrap();
        assert_eq!(imp.extra.keys().collect::<Vec<_>>(), vec![key]);
    }

    #[test]
    fn test_impersonation_requires_user() {
        let map = headers(&[
            ("Impersonate-Group", "devs"),
            ("Impersonate-Extra-Scopes", "view"),
        ]);
        assert!(extract_impersonation(&map).is_none());
    }

    #[test]
    fn test_identity_from_headers_sets_username() {
        let map = headers(&[
            ("Authorization", "Bearer tok"),
            ("Impersonate-User", "bob"),
        ]);
        let identity = identity_from_headers(&map).unwrap();
        assert_eq!(identity.token(), "tok");
        assert_eq!(identity.username(), Some("bob"));
    }

    #[test]
    fn test_identity_from_headers_without_bearer() {
        let map = headers(&[("Impersonate-User", "bob")]);
        assert!(identity_from_headers(&map).is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let identity = AuthIdentity::from_token("super-secret");
        let printed = format!("{:?}", identity);
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("redacted"));
    }
}
