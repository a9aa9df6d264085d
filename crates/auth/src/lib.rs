//! `campus-auth`: pure authorization and tenancy model.
//!
//! This crate is intentionally decoupled from IO, async runtimes and storage:
//! everything here is a deterministic function of its inputs.

pub mod audit;
pub mod authorize;
pub mod catalog;
pub mod credentials;
pub mod permissions;
pub mod profile;
pub mod redirect;
pub mod registry;
pub mod roles;
pub mod routes;
pub mod session;

pub use audit::{
    Actor, AuditAction, AuditEntityType, AuditEvent, AuditLogEntry, AuditQuery,
    DEFAULT_AUDIT_QUERY_LIMIT, NewAuditLogEntry, UNKNOWN_ACTOR,
};
pub use authorize::{DecisionExplanation, RouteDecision, RouteRequirement, authorize_route, explain_route};
pub use catalog::RbacCatalog;
pub use credentials::{AuthError, AuthStateEvent, Credentials, SessionToken, TokenValidationError, validate_token};
pub use permissions::Permission;
pub use profile::{Identity, Institution, Profile, SubscriptionStatus};
pub use redirect::choose_home;
pub use registry::{has_permission, permissions_of, role_permissions};
pub use roles::{Role, parse_role_names};
pub use routes::{Route, authorize_path};
pub use session::{Session, SessionState};
