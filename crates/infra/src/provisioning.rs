//! Tenant provisioning: create an institution together with its first admin.
//!
//! The transaction itself belongs to an external privileged collaborator; this
//! module gates it behind `institutions.manage`, validates the request and
//! leaves an audit trail.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use campus_auth::{
    AuditAction, AuditEntityType, AuditEvent, Credentials, Identity, Institution, Permission, Profile,
    Role, RouteDecision, SubscriptionStatus, authorize_route,
};
use campus_core::{DomainError, DomainResult, InstitutionId, UserId};

use crate::audit::AuditRecorder;
use crate::directory::InMemoryDirectory;
use crate::identity::InMemoryIdentityProvider;
use crate::session::SessionStore;

/// Request to create a tenant and its administrator account.
#[derive(Clone, PartialEq, Eq)]
pub struct ProvisionInstitution {
    pub institution_name: String,
    pub admin_full_name: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl ProvisionInstitution {
    pub fn validate(&self) -> DomainResult<()> {
        if self.institution_name.trim().is_empty() {
            return Err(DomainError::validation("institution name is required"));
        }
        if self.admin_full_name.trim().is_empty() {
            return Err(DomainError::validation("admin full name is required"));
        }
        if !plausible_email(&self.admin_email) {
            return Err(DomainError::validation(format!(
                "'{}' is not a valid admin email",
                self.admin_email.trim()
            )));
        }
        if self.admin_password.is_empty() {
            return Err(DomainError::validation("admin password is required"));
        }
        Ok(())
    }
}

impl core::fmt::Debug for ProvisionInstitution {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProvisionInstitution")
            .field("institution_name", &self.institution_name)
            .field("admin_full_name", &self.admin_full_name)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

fn plausible_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// A freshly created tenant and its admin identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedInstitution {
    pub institution: Institution,
    pub admin: Identity,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProvisioningError {
    #[error("not allowed to provision institutions ({0:?})")]
    Denied(RouteDecision),

    #[error("invalid provisioning request: {0}")]
    Invalid(#[from] DomainError),

    #[error("provisioning failed: {0}")]
    Failed(String),
}

/// External privileged function that creates tenant + admin atomically.
#[async_trait]
pub trait InstitutionProvisioner: Send + Sync {
    async fn provision(
        &self,
        request: &ProvisionInstitution,
    ) -> Result<ProvisionedInstitution, ProvisioningError>;
}

/// Provisioner over the in-memory adapters, for tests/dev.
#[derive(Debug, Clone)]
pub struct InMemoryProvisioner {
    directory: Arc<InMemoryDirectory>,
    identity: Arc<InMemoryIdentityProvider>,
}

impl InMemoryProvisioner {
    pub fn new(directory: Arc<InMemoryDirectory>, identity: Arc<InMemoryIdentityProvider>) -> Self {
        Self { directory, identity }
    }
}

#[async_trait]
impl InstitutionProvisioner for InMemoryProvisioner {
    async fn provision(
        &self,
        request: &ProvisionInstitution,
    ) -> Result<ProvisionedInstitution, ProvisioningError> {
        if self.identity.is_registered(&request.admin_email) {
            return Err(ProvisioningError::Failed(format!(
                "an account already exists for '{}'",
                request.admin_email.trim()
            )));
        }

        let institution = Institution {
            id: InstitutionId::new(),
            name: request.institution_name.trim().to_string(),
            is_active: true,
            subscription_status: Some(SubscriptionStatus::Trial),
        };
        self.directory.upsert_institution(institution.clone());

        let user_id = UserId::new();
        let admin = self
            .identity
            .register(&request.admin_email, &request.admin_password, user_id);
        self.directory.upsert_profile(Profile {
            user_id,
            full_name: request.admin_full_name.trim().to_string(),
            email: Credentials::new(&request.admin_email, "").email,
            phone: None,
            institution_id: Some(institution.id),
        });
        self.directory.set_roles(user_id, [Role::Admin.as_str()]);

        Ok(ProvisionedInstitution { institution, admin })
    }
}

/// Platform-operator entry point for creating tenants.
pub struct ProvisioningService {
    sessions: Arc<SessionStore>,
    provisioner: Arc<dyn InstitutionProvisioner>,
    audit: AuditRecorder,
}

impl ProvisioningService {
    pub fn new(
        sessions: Arc<SessionStore>,
        provisioner: Arc<dyn InstitutionProvisioner>,
        audit: AuditRecorder,
    ) -> Self {
        Self {
            sessions,
            provisioner,
            audit,
        }
    }

    pub async fn provision(
        &self,
        request: ProvisionInstitution,
    ) -> Result<ProvisionedInstitution, ProvisioningError> {
        let session = self.sessions.snapshot();
        let decision = authorize_route(&session, Permission::InstitutionsManage.into());
        if !decision.is_allowed() {
            warn!(?decision, "institution provisioning denied");
            return Err(ProvisioningError::Denied(decision));
        }

        request.validate()?;

        let provisioned = self.provisioner.provision(&request).await.inspect_err(|e| {
            warn!(institution = %request.institution_name, error = %e, "institution provisioning failed");
        })?;

        self.audit.record(
            AuditEvent::new(AuditAction::Create, AuditEntityType::Institution)
                .with_entity_id(provisioned.institution.id)
                .with_entity_name(provisioned.institution.name.clone())
                .with_detail("admin_user_id", provisioned.admin.user_id.to_string())
                .with_detail("admin_email", provisioned.admin.email.clone().unwrap_or_default()),
        );
        info!(
            institution_id = %provisioned.institution.id,
            admin_user_id = %provisioned.admin.user_id,
            "institution provisioned"
        );

        Ok(provisioned)
    }
}
