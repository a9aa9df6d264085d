//! Profile / role / institution lookups (external persistence collaborator).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use campus_auth::{Institution, Profile};
use campus_core::{InstitutionId, UserId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Read access to the records a session is hydrated from.
#[async_trait]
pub trait Directory: Send + Sync {
    /// `Ok(None)` when the caller has no profile row.
    async fn fetch_profile(&self, user_id: UserId) -> Result<Option<Profile>, DirectoryError>;

    /// Raw role names as stored; unknown names are dropped by the caller.
    async fn fetch_roles(&self, user_id: UserId) -> Result<Vec<String>, DirectoryError>;

    async fn fetch_institution(
        &self,
        institution_id: InstitutionId,
    ) -> Result<Option<Institution>, DirectoryError>;
}

/// In-memory directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    profiles: RwLock<HashMap<UserId, Profile>>,
    roles: RwLock<HashMap<UserId, Vec<String>>>,
    institutions: RwLock<HashMap<InstitutionId, Institution>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_profile(&self, profile: Profile) {
        self.profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(profile.user_id, profile);
    }

    pub fn set_roles<I, S>(&self, user_id: UserId, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user_id, names.into_iter().map(Into::into).collect());
    }

    pub fn upsert_institution(&self, institution: Institution) {
        self.institutions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(institution.id, institution);
    }

    /// Suspend or reactivate an institution. Returns false if it does not exist.
    pub fn set_institution_active(&self, institution_id: InstitutionId, active: bool) -> bool {
        let mut institutions = self.institutions.write().unwrap_or_else(PoisonError::into_inner);
        match institutions.get_mut(&institution_id) {
            Some(institution) => {
                institution.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn fetch_profile(&self, user_id: UserId) -> Result<Option<Profile>, DirectoryError> {
        Ok(self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned())
    }

    async fn fetch_roles(&self, user_id: UserId) -> Result<Vec<String>, DirectoryError> {
        Ok(self
            .roles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_institution(
        &self,
        institution_id: InstitutionId,
    ) -> Result<Option<Institution>, DirectoryError> {
        Ok(self
            .institutions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&institution_id)
            .cloned())
    }
}
