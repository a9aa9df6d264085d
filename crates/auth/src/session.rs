//! Hydrated caller session (immutable snapshot).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::registry::{has_permission, permissions_of};
use crate::{Identity, Institution, Permission, Profile, Role};

/// Coarse lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No caller is signed in.
    Anonymous,
    /// Identity, roles or tenant are still being resolved.
    Hydrating,
    /// Resolution finished (possibly degraded to zero permissions).
    Ready,
}

/// The process-wide view of the current caller.
///
/// A `Session` is a snapshot: transitions build a new value and replace the old
/// one wholesale. While `loading` is true no other field is authoritative.
///
/// Role-derived flags (`is_admin`, `is_super_admin`, ...) are always computed
/// from `roles` on read and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub identity: Option<Identity>,
    pub profile: Option<Profile>,
    pub roles: BTreeSet<Role>,
    pub institution: Option<Institution>,
    pub loading: bool,
}

impl Default for Session {
    /// The session that exists at process start, before the identity provider
    /// has reported anything.
    fn default() -> Self {
        Self {
            identity: None,
            profile: None,
            roles: BTreeSet::new(),
            institution: None,
            loading: true,
        }
    }
}

impl Session {
    /// Signed-out session.
    pub fn anonymous() -> Self {
        Self {
            loading: false,
            ..Self::default()
        }
    }

    /// A caller has been identified; profile, roles and tenant are pending.
    pub fn hydrating(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::default()
        }
    }

    /// Fully resolved session.
    pub fn ready(
        identity: Identity,
        profile: Option<Profile>,
        roles: BTreeSet<Role>,
        institution: Option<Institution>,
    ) -> Self {
        Self {
            identity: Some(identity),
            profile,
            roles,
            institution,
            loading: false,
        }
    }

    /// Signed in at the provider level, but the application grants nothing.
    ///
    /// Used when hydration fails so the UI settles on "forbidden" instead of
    /// spinning or, worse, granting access.
    pub fn degraded(identity: Identity) -> Self {
        Self::ready(identity, None, BTreeSet::new(), None)
    }

    pub fn state(&self) -> SessionState {
        if self.loading {
            SessionState::Hydrating
        } else if self.identity.is_none() {
            SessionState::Anonymous
        } else {
            SessionState::Ready
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn roles(&self) -> &BTreeSet<Role> {
        &self.roles
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_super_admin(&self) -> bool {
        self.has_role(Role::SuperAdmin)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin) || self.is_super_admin()
    }

    pub fn is_secretaria(&self) -> bool {
        self.has_role(Role::Secretaria)
    }

    pub fn is_professor(&self) -> bool {
        self.has_role(Role::Professor)
    }

    pub fn is_aluno(&self) -> bool {
        self.has_role(Role::Aluno)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        has_permission(&self.roles, permission)
    }

    /// Effective permissions, for UI affordances.
    pub fn permissions(&self) -> BTreeSet<Permission> {
        permissions_of(&self.roles)
    }
}
