use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use super::PasswordHasher;
use crate::store::AccessStore;
use crate::types::User;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("authorization scheme is not Basic")]
    InvalidScheme,

    #[error("malformed Basic credentials")]
    Malformed,

    #[error("unknown user")]
    UnknownUser,

    #[error("secret does not match")]
    InvalidSecret,

    #[error("user lookup failed")]
    LookupFailed,
}

/// Username and secret carried by a `Basic` authorization header.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicCredentials {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Returns true if the header uses the `Basic` scheme (case-insensitive).
#[must_use]
pub fn is_basic_scheme(header: &str) -> bool {
    header
        .split_once(' ')
        .is_some_and(|(scheme, _)| scheme.eq_ignore_ascii_case("basic"))
}

/// Decodes a `Basic base64(username:secret)` header.
pub fn decode_basic_auth(header: &str) -> Result<BasicCredentials, CredentialError> {
    let (scheme, encoded) = header
        .split_once(' ')
        .ok_or(CredentialError::InvalidScheme)?;

    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(CredentialError::InvalidScheme);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| CredentialError::Malformed)?;
    let credentials = String::from_utf8(decoded).map_err(|_| CredentialError::Malformed)?;

    let (username, secret) = credentials
        .split_once(':')
        .ok_or(CredentialError::Malformed)?;

    if username.is_empty() {
        return Err(CredentialError::Malformed);
    }

    Ok(BasicCredentials {
        username: username.to_string(),
        secret: secret.to_string(),
    })
}

/// Resolves a username/secret pair to a known user.
pub fn resolve_user(
    store: &dyn AccessStore,
    credentials: &BasicCredentials,
) -> Result<User, CredentialError> {
    let user = store
        .get_user_by_username(&credentials.username)
        .map_err(|e| {
            tracing::warn!("Failed to look up user '{}': {e}", credentials.username);
            CredentialError::LookupFailed
        })?
        .ok_or(CredentialError::UnknownUser)?;

    let hasher = PasswordHasher::new();
    match hasher.verify(&credentials.secret, &user.password_hash) {
        Ok(true) => Ok(user),
        Ok(false) => Err(CredentialError::InvalidSecret),
        Err(e) => {
            tracing::warn!("Stored secret for '{}' is unusable: {e}", user.username);
            Err(CredentialError::InvalidSecret)
        }
    }
}

/// Builds a `Basic` header value for the given pair.
#[must_use]
pub fn encode_basic_auth(username: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{secret}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_display_without_secret() {
        assert_eq!(CredentialError::InvalidSecret.to_string(), "secret does not match");
        assert_eq!(
            CredentialError::InvalidScheme.to_string(),
            "authorization scheme is not Basic"
        );
    }

    #[test]
    fn test_decode_round_trip() {
        let header = encode_basic_auth("alice", "s3cret:with:colons");
        let creds = decode_basic_auth(&header).unwrap();
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.secret, "s3cret:with:colons");
    }

    #[test]
    fn test_scheme_is_case_insensitive() {
        let header = encode_basic_auth("alice", "pw").replacen("Basic", "basic", 1);
        assert!(is_basic_scheme(&header));
        assert!(decode_basic_auth(&header).is_ok());
    }

    #[test]
    fn test_bearer_rejected() {
        assert!(!is_basic_scheme("Bearer abc"));
        assert_eq!(
            decode_basic_auth("Bearer abc"),
            Err(CredentialError::InvalidScheme)
        );
        assert_eq!(decode_basic_auth("Basic"), Err(CredentialError::InvalidScheme));
    }

    #[test]
    fn test_malformed_payloads() {
        assert_eq!(
            decode_basic_auth("Basic !!!not-base64"),
            Err(CredentialError::Malformed)
        );
        let no_colon = format!("Basic {}", STANDARD.encode("alice"));
        assert_eq!(decode_basic_auth(&no_colon), Err(CredentialError::Malformed));
        let empty_user = format!("Basic {}", STANDARD.encode(":pw"));
        assert_eq!(decode_basic_auth(&empty_user), Err(CredentialError::Malformed));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = decode_basic_auth(&encode_basic_auth("alice", "hunter2")).unwrap();
        let debug = format!("{creds:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("hunter2"));
    }
}
