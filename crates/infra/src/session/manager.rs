//! Session hydration state machine.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{Notify, broadcast::error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use campus_auth::{
    AuthError, AuthStateEvent, Credentials, Identity, Role, Session, SessionToken, parse_role_names,
    validate_token,
};

use crate::directory::Directory;
use crate::identity::IdentityProvider;
use crate::session::SessionStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("auth listener already started")]
    AlreadyStarted,
}

/// A `SignedIn` event whose profile/roles/tenant still have to be fetched.
#[derive(Debug, Clone)]
struct PendingHydration {
    generation: u64,
    identity: Identity,
}

/// Tokens seen by this manager.
///
/// Guarded by one mutex that is held across the matching store write, so a
/// sign-out and an incoming `SignedIn` cannot interleave.
#[derive(Debug, Default)]
struct Tokens {
    current: Option<SessionToken>,
    /// Signed-out access tokens and their expiry. A `SignedIn` for one of these
    /// is stale.
    revoked: HashMap<String, DateTime<Utc>>,
}

impl Tokens {
    fn is_current(&self, access_token: &str) -> bool {
        self.current
            .as_ref()
            .is_some_and(|t| t.access_token == access_token)
    }

    fn is_revoked(&self, access_token: &str) -> bool {
        self.revoked.contains_key(access_token)
    }

    /// Forget the current token and remember it as signed out.
    fn revoke_current(&mut self) -> Option<SessionToken> {
        let token = self.current.take()?;
        let now = Utc::now();
        self.revoked.retain(|_, expires_at| *expires_at > now);
        self.revoked.insert(token.access_token.clone(), token.expires_at);
        Some(token)
    }
}

/// Owns the process session and drives it from identity-provider events.
///
/// ```text
///             SignedOut                     SignedIn(token)
///   * ──────────────────► Anonymous ◄──────────────┐
///   │                        │ SignedIn(token)     │ SignedOut
///   │                        ▼                     │
///   └── (process start) ─► Hydrating ──(fetches)─► Ready
/// ```
///
/// Hydration failures settle in `Ready` with no permissions. Stale events (a
/// `SignedIn` for a signed-out token, a sign-out naming an older token) are
/// ignored.
pub struct SessionManager {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn Directory>,
    store: Arc<SessionStore>,
    tokens: Mutex<Tokens>,
    listening: AtomicBool,
}

impl SessionManager {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn Directory>,
        store: Arc<SessionStore>,
    ) -> Self {
        Self {
            provider,
            directory,
            store,
            tokens: Mutex::new(Tokens::default()),
            listening: AtomicBool::new(false),
        }
    }

    /// The store to hand to readers (route guards, audit recorder, ...).
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn session(&self) -> Arc<Session> {
        self.store.snapshot()
    }

    pub fn current_roles(&self) -> BTreeSet<Role> {
        self.session().roles.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.session().is_loading()
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.session().has_role(role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.session().is_super_admin()
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_admin()
    }

    pub fn is_secretaria(&self) -> bool {
        self.session().is_secretaria()
    }

    pub fn is_professor(&self) -> bool {
        self.session().is_professor()
    }

    pub fn is_aluno(&self) -> bool {
        self.session().is_aluno()
    }

    /// Ask the identity provider to verify `credentials`.
    ///
    /// The session itself is only updated by the auth event that follows, but
    /// the token is kept right away so a `sign_out` issued before that event
    /// arrives still revokes it.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), AuthError> {
        credentials.validate()?;

        match self.provider.verify_credential(credentials).await {
            Ok(token) => {
                info!(user_id = %token.identity.user_id, "sign-in accepted");
                let mut tokens = self.tokens();
                if !tokens.is_revoked(&token.access_token) {
                    tokens.current = Some(token);
                }
                Ok(())
            }
            Err(e) => {
                warn!(email = %credentials.email, error = %e, "sign-in rejected");
                Err(e)
            }
        }
    }

    /// Clear the local session now and revoke the token in the background.
    ///
    /// The returned handle resolves when the revocation attempt finishes; callers
    /// are not expected to await it. `None` when there was no token to revoke or
    /// no Tokio runtime to revoke it on; the local clear happens regardless.
    pub fn sign_out(&self) -> Option<JoinHandle<()>> {
        let token = {
            let mut tokens = self.tokens();
            let token = tokens.revoke_current();
            self.store.replace(Session::anonymous());
            token
        };
        info!("session cleared by sign-out");

        let token = token?;
        let provider = Arc::clone(&self.provider);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => Some(runtime.spawn(async move {
                if let Err(e) = provider.revoke(&token).await {
                    warn!(user_id = %token.identity.user_id, error = %e, "token revocation failed");
                }
            })),
            Err(_) => {
                warn!(user_id = %token.identity.user_id, "no async runtime; token revocation skipped");
                None
            }
        }
    }

    /// Apply one auth event and, for `SignedIn`, wait for its hydration.
    pub async fn handle_event(&self, event: AuthStateEvent) {
        if let Some(pending) = self.begin(event) {
            hydrate(self.directory.as_ref(), &self.store, pending).await;
        }
    }

    /// Subscribe to the identity provider for the lifetime of the process.
    ///
    /// Only one subscription may exist; a second call fails.
    pub fn start(self: &Arc<Self>) -> Result<AuthListener, SessionError> {
        if self.listening.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyStarted);
        }

        let mut events = self.provider.subscribe();
        let shutdown = Arc::new(Notify::new());
        let manager = Arc::clone(self);
        let stop = Arc::clone(&shutdown);

        let join = tokio::spawn(async move {
            info!("auth listener started");
            loop {
                tokio::select! {
                    _ = stop.notified() => {
                        info!("auth listener received shutdown signal");
                        break;
                    }
                    received = events.recv() => match received {
                        Ok(event) => {
                            if let Some(pending) = manager.begin(event) {
                                let directory = Arc::clone(&manager.directory);
                                let store = Arc::clone(&manager.store);
                                tokio::spawn(async move {
                                    hydrate(directory.as_ref(), &store, pending).await;
                                });
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "auth listener lagged behind the identity provider");
                        }
                        Err(RecvError::Closed) => {
                            info!("identity provider closed the auth event stream");
                            break;
                        }
                    }
                }
            }
        });

        Ok(AuthListener { shutdown, join })
    }

    /// Synchronous part of a transition.
    fn begin(&self, event: AuthStateEvent) -> Option<PendingHydration> {
        let mut tokens = self.tokens();

        match event {
            AuthStateEvent::SignedOut { access_token } => {
                // A scoped sign-out only ends the session it names.
                if access_token.as_deref().is_some_and(|t| !tokens.is_current(t)) {
                    debug!("ignoring sign-out for a token that is no longer current");
                    return None;
                }
                tokens.revoke_current();
                self.store.replace(Session::anonymous());
                info!("session cleared by auth event");
                None
            }
            AuthStateEvent::SignedIn(token) => {
                if tokens.is_revoked(&token.access_token) {
                    debug!(user_id = %token.identity.user_id, "ignoring sign-in for a token already signed out");
                    return None;
                }
                if let Err(e) = validate_token(&token, Utc::now()) {
                    warn!(user_id = %token.identity.user_id, error = %e, "ignoring sign-in with unusable token");
                    tokens.revoke_current();
                    self.store.replace(Session::anonymous());
                    return None;
                }

                let identity = token.identity.clone();
                tokens.current = Some(token);
                let generation = self.store.replace(Session::hydrating(identity.clone()));
                debug!(user_id = %identity.user_id, generation, "hydrating session");
                Some(PendingHydration { generation, identity })
            }
        }
    }

    fn tokens(&self) -> MutexGuard<'_, Tokens> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to the single auth-event subscription.
#[derive(Debug)]
pub struct AuthListener {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
}

impl AuthListener {
    /// Stop listening and wait for the listener task to exit.
    pub async fn shutdown(self) {
        self.shutdown.notify_one();
        if let Err(e) = self.join.await {
            warn!(error = %e, "auth listener task ended abnormally");
        }
    }
}

async fn hydrate(directory: &dyn Directory, store: &SessionStore, pending: PendingHydration) {
    let user_id = pending.identity.user_id;
    let session = resolve_session(directory, pending.identity).await;
    let ready_roles = session.roles.len();

    if store.complete(pending.generation, session) {
        info!(user_id = %user_id, roles = ready_roles, "session ready");
    } else {
        debug!(user_id = %user_id, generation = pending.generation, "discarding superseded hydration");
    }
}

/// Fetch profile and roles concurrently, then the institution, and assemble the
/// session. Any failure yields a zero-permission session.
async fn resolve_session(directory: &dyn Directory, identity: Identity) -> Session {
    let user_id = identity.user_id;

    let (profile, role_names) = tokio::join!(
        directory.fetch_profile(user_id),
        directory.fetch_roles(user_id)
    );

    let (profile, role_names) = match (profile, role_names) {
        (Ok(profile), Ok(role_names)) => (profile, role_names),
        (Err(e), _) | (_, Err(e)) => {
            warn!(user_id = %user_id, error = %e, "session hydration failed; granting no permissions");
            return Session::degraded(identity);
        }
    };

    let (roles, unknown) = parse_role_names(&role_names);
    if !unknown.is_empty() {
        warn!(user_id = %user_id, unknown = ?unknown, "ignoring unknown role names");
    }

    let institution = match profile.as_ref().and_then(|p| p.institution_id) {
        None => None,
        Some(institution_id) => match directory.fetch_institution(institution_id).await {
            Ok(Some(institution)) => Some(institution),
            Ok(None) => {
                warn!(user_id = %user_id, institution_id = %institution_id, "profile references a missing institution; granting no permissions");
                return Session::degraded(identity);
            }
            Err(e) => {
                warn!(user_id = %user_id, institution_id = %institution_id, error = %e, "institution lookup failed; granting no permissions");
                return Session::degraded(identity);
            }
        },
    };

    if profile.is_none() {
        debug!(user_id = %user_id, "caller has no profile");
    }

    Session::ready(identity, profile, roles, institution)
}
