//! Identity provider boundary.
//!
//! Credential verification, token issuance and revocation belong to an external
//! provider. The core only consumes its results and its auth-state events.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use campus_auth::{AuthError, AuthStateEvent, Credentials, Identity, SessionToken};
use campus_core::UserId;

/// Buffered auth events per subscriber before it starts lagging.
const AUTH_EVENT_BUFFER: usize = 32;

/// Opaque identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verify credentials and issue a session token.
    ///
    /// A successful verification is followed by a `SignedIn` auth event; the
    /// session is hydrated from that event, not from this return value.
    async fn verify_credential(&self, credentials: &Credentials) -> Result<SessionToken, AuthError>;

    /// Revoke a previously issued token.
    async fn revoke(&self, token: &SessionToken) -> Result<(), AuthError>;

    /// Stream of auth-state changes.
    fn subscribe(&self) -> broadcast::Receiver<AuthStateEvent>;
}

#[derive(Debug, Clone)]
struct Account {
    password: String,
    identity: Identity,
}

/// In-memory identity provider for tests/dev.
///
/// Passwords are compared verbatim; this is not a credential store.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    events: broadcast::Sender<AuthStateEvent>,
    token_ttl: Duration,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_BUFFER);
        Self {
            accounts: RwLock::new(HashMap::new()),
            events,
            token_ttl: Duration::hours(1),
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Register an account. The email is normalized like [`Credentials::new`].
    pub fn register(&self, email: &str, password: &str, user_id: UserId) -> Identity {
        let normalized = Credentials::new(email, password).email;
        let identity = Identity::new(user_id, Some(normalized.clone()));
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                normalized,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
        identity
    }

    pub fn is_registered(&self, email: &str) -> bool {
        let normalized = Credentials::new(email, "").email;
        self.accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&normalized)
    }

    /// Publish an auth event as if the provider had produced it (token expiry,
    /// sign-out from another tab, ...).
    pub fn emit(&self, event: AuthStateEvent) {
        // No subscribers is fine: nobody is listening yet.
        let _ = self.events.send(event);
    }

    /// Issue a token for an identity without checking a password.
    pub fn issue_token(&self, identity: Identity) -> SessionToken {
        let issued_at = Utc::now();
        SessionToken {
            access_token: Uuid::now_v7().to_string(),
            identity,
            issued_at,
            expires_at: issued_at + self.token_ttl,
        }
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn verify_credential(&self, credentials: &Credentials) -> Result<SessionToken, AuthError> {
        let account = self
            .accounts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&credentials.email)
            .cloned();

        match account {
            Some(account) if account.password == credentials.password => {
                let token = self.issue_token(account.identity);
                self.emit(AuthStateEvent::SignedIn(token.clone()));
                Ok(token)
            }
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn revoke(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.emit(AuthStateEvent::SignedOut {
            access_token: Some(token.access_token.clone()),
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateEvent> {
        self.events.subscribe()
    }
}
