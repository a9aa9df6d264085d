use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Identity;

/// Email/password pair submitted by the login form.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Normalizes the email (trimmed, lowercase); the password is kept verbatim.
    pub fn new(email: impl AsRef<str>, password: impl Into<String>) -> Self {
        Self {
            email: email.as_ref().trim().to_lowercase(),
            password: password.into(),
        }
    }

    /// Reject obviously incomplete input before it reaches the identity provider.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.email.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        Ok(())
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-in failure, returned to the login form as a value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("email and password are required")]
    MissingCredentials,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Session token issued by the identity provider (transport-agnostic).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub access_token: String,
    pub identity: Identity,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionToken")
            .field("access_token", &"<redacted>")
            .field("identity", &self.identity)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,
}

/// Deterministically validate a token's time window.
///
/// Signature verification is the identity provider's job; this only checks the
/// window the provider stated.
pub fn validate_token(token: &SessionToken, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if token.expires_at <= token.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < token.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= token.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

/// Notification from the identity provider that the signed-in caller changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStateEvent {
    SignedIn(SessionToken),
    /// `access_token` names the token that ended; `None` ends whatever session
    /// is current (expiry, sign-out from another device).
    SignedOut { access_token: Option<String> },
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use campus_core::UserId;

    fn token(issued_at: DateTime<Utc>, ttl: Duration) -> SessionToken {
        SessionToken {
            access_token: "secret".to_string(),
            identity: Identity::new(UserId::new(), None),
            issued_at,
            expires_at: issued_at + ttl,
        }
    }

    #[test]
    fn token_window_is_checked() {
        let now = Utc::now();
        assert_eq!(validate_token(&token(now, Duration::hours(1)), now), Ok(()));
        assert_eq!(
            validate_token(&token(now - Duration::hours(2), Duration::hours(1)), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_token(&token(now + Duration::minutes(5), Duration::hours(1)), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_token(&token(now, Duration::zero()), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let creds = Credentials::new("  Ana@Escola.EDU ", "hunter2");
        assert_eq!(creds.email, "ana@escola.edu");
        assert!(!format!("{creds:?}").contains("hunter2"));

        let t = token(Utc::now(), Duration::hours(1));
        assert!(!format!("{t:?}").contains("secret"));
    }

    #[test]
    fn blank_credentials_are_rejected_locally() {
        assert_eq!(Credentials::new(" ", "x").validate(), Err(AuthError::MissingCredentials));
        assert_eq!(Credentials::new("a@b.c", "").validate(), Err(AuthError::MissingCredentials));
        assert_eq!(Credentials::new("a@b.c", "x").validate(), Ok(()));
    }
}
