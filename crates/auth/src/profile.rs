//! Caller identity, profile and tenant records as supplied by external collaborators.

use serde::{Deserialize, Serialize};

use campus_core::{Entity, InstitutionId, UserId};

/// Opaque caller handle issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    /// Raw account email, when the provider exposes it.
    pub email: Option<String>,
}

impl Identity {
    pub fn new(user_id: UserId, email: Option<String>) -> Self {
        Self { user_id, email }
    }
}

/// Identity attributes of a caller (owned by the identity provider, read-only here).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    /// `None` for platform-level accounts that belong to no institution.
    pub institution_id: Option<InstitutionId>,
}

impl Entity for Profile {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.user_id
    }
}

/// Billing state of an institution, as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Trial,
    Active,
    PastDue,
    Canceled,
}

/// Tenant record.
///
/// An inactive institution is locked out as a whole, whatever the caller's roles
/// (platform operators excepted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub is_active: bool,
    pub subscription_status: Option<SubscriptionStatus>,
}

impl Entity for Institution {
    type Id = InstitutionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
