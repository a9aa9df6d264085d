//! Infrastructure layer: session lifecycle, audit pipeline, config and the
//! collaborator boundaries (identity provider, directory, provisioning).

pub mod audit;
pub mod config;
pub mod directory;
pub mod identity;
pub mod provisioning;
pub mod session;

pub use audit::{AuditRecorder, AuditStore, AuditStoreError, AuditWriterHandle, AuditWriterStats, InMemoryAuditStore};
pub use config::{AuditConfig, CoreConfig};
pub use directory::{Directory, DirectoryError, InMemoryDirectory};
pub use identity::{IdentityProvider, InMemoryIdentityProvider};
pub use provisioning::{
    InMemoryProvisioner, InstitutionProvisioner, ProvisionInstitution, ProvisionedInstitution,
    ProvisioningError, ProvisioningService,
};
pub use session::{AuthListener, SessionError, SessionManager, SessionStore};
