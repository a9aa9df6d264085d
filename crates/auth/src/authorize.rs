use serde::Serialize;

use crate::{Permission, Role, Session};

/// What a route or action demands of the caller.
///
/// `Authenticated` is an explicit opt-in for screens that any signed-in caller of
/// an active institution may open (their own profile, for instance). It is not
/// what you get by forgetting to name a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "permission", rename_all = "snake_case")]
pub enum RouteRequirement {
    Authenticated,
    Permission(Permission),
}

impl From<Permission> for RouteRequirement {
    fn from(value: Permission) -> Self {
        RouteRequirement::Permission(value)
    }
}

impl core::fmt::Display for RouteRequirement {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RouteRequirement::Authenticated => f.write_str("authenticated"),
            RouteRequirement::Permission(p) => write!(f, "permission '{p}'"),
        }
    }
}

/// Outcome of a route/action authorization.
///
/// Every variant is a normal state the UI renders; none of them is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteDecision {
    Loading,
    Unauthenticated,
    InstitutionInactive,
    Forbidden,
    Allowed,
}

impl RouteDecision {
    pub fn is_allowed(self) -> bool {
        self == RouteDecision::Allowed
    }
}

/// Decide whether the current session may reach something guarded by `requirement`.
///
/// - No IO
/// - No panics
/// - Checks run in a fixed order; each assumes the previous ones passed
pub fn authorize_route(session: &Session, requirement: RouteRequirement) -> RouteDecision {
    if session.loading {
        return RouteDecision::Loading;
    }

    if session.identity.is_none() {
        return RouteDecision::Unauthenticated;
    }

    // Platform operators are the only bypass for a suspended tenant.
    if !session.is_super_admin()
        && session.institution.as_ref().is_some_and(|i| !i.is_active)
    {
        return RouteDecision::InstitutionInactive;
    }

    if let RouteRequirement::Permission(permission) = requirement {
        if !session.has_permission(permission) {
            return RouteDecision::Forbidden;
        }
    }

    RouteDecision::Allowed
}

// ─────────────────────────────────────────────────────────────────────────────
// Decision Explanation
// ─────────────────────────────────────────────────────────────────────────────

/// Explanation of a route decision, for support tooling and debugging.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionExplanation {
    pub requirement: RouteRequirement,
    pub decision: RouteDecision,
    /// Human-readable reason for the decision.
    pub reason: String,
    pub roles: Vec<Role>,
    pub effective_permissions: Vec<Permission>,
    /// `None` when the caller belongs to no institution.
    pub institution_active: Option<bool>,
    /// Roles that would grant the missing permission (only on `Forbidden`).
    pub granting_roles: Vec<Role>,
}

/// Explain why `authorize_route` answers what it answers.
///
/// The decision is always taken from `authorize_route`, so the two cannot drift.
pub fn explain_route(session: &Session, requirement: RouteRequirement) -> DecisionExplanation {
    let decision = authorize_route(session, requirement);
    let institution_active = session.institution.as_ref().map(|i| i.is_active);

    let mut granting_roles = Vec::new();

    let reason = match decision {
        RouteDecision::Loading => "Session is still being resolved".to_string(),
        RouteDecision::Unauthenticated => "No caller is signed in".to_string(),
        RouteDecision::InstitutionInactive => {
            let name = session
                .institution
                .as_ref()
                .map(|i| i.name.as_str())
                .unwrap_or_default();
            format!("Institution '{name}' is inactive; contact support")
        }
        RouteDecision::Forbidden => {
            if let RouteRequirement::Permission(p) = requirement {
                granting_roles = Role::ALL
                    .iter()
                    .copied()
                    .filter(|r| crate::registry::role_permissions(*r).contains(&p))
                    .collect();
            }
            format!("Caller lacks {requirement}")
        }
        RouteDecision::Allowed => match requirement {
            RouteRequirement::Authenticated => "Caller is signed in".to_string(),
            RouteRequirement::Permission(p) => format!("Caller holds permission '{p}'"),
        },
    };

    DecisionExplanation {
        requirement,
        decision,
        reason,
        roles: session.roles.iter().copied().collect(),
        effective_permissions: session.permissions().into_iter().collect(),
        institution_active,
        granting_roles,
    }
}
