//! Audit storage implementations.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;

use campus_auth::{AuditLogEntry, AuditQuery, NewAuditLogEntry};
use campus_core::AuditLogId;

/// Append-only audit persistence.
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Persist an entry. The store assigns its id and `created_at`.
    async fn insert(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, AuditStoreError>;

    /// Matching entries, newest first, at most `query.effective_limit(..)` of them.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, AuditStoreError>;
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuditStoreError {
    #[error("audit store unavailable: {0}")]
    Unavailable(String),

    #[error("audit entry rejected: {0}")]
    Rejected(String),
}

/// In-memory audit store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, AuditStoreError> {
        if entry.actor_name.trim().is_empty() {
            return Err(AuditStoreError::Rejected("actor_name is empty".to_string()));
        }

        let entry = entry.persisted(AuditLogId::new(), Utc::now());
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(entry)
    }

    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        // Newest insert first so equal timestamps keep reverse insertion order
        // after the stable sort.
        let mut result: Vec<_> = entries
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        result.truncate(query.effective_limit(usize::MAX));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_auth::{Actor, AuditAction, AuditEntityType, AuditEvent, DEFAULT_AUDIT_QUERY_LIMIT};

    fn entry(action: AuditAction, entity_type: AuditEntityType) -> NewAuditLogEntry {
        let actor = Actor {
            user_id: None,
            name: "Secretaria Geral".to_string(),
        };
        NewAuditLogEntry::new(actor, AuditEvent::new(action, entity_type))
    }

    #[tokio::test]
    async fn insert_assigns_identity_and_timestamp() {
        let store = InMemoryAuditStore::new();
        let before = Utc::now();

        let a = store.insert(entry(AuditAction::Create, AuditEntityType::Curso)).await.unwrap();
        let b = store.insert(entry(AuditAction::Create, AuditEntityType::Curso)).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(a.created_at >= before);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn blank_actor_is_rejected() {
        let store = InMemoryAuditStore::new();
        let mut new_entry = entry(AuditAction::Delete, AuditEntityType::Aluno);
        new_entry.actor_name = " ".to_string();

        let err = store.insert(new_entry).await.unwrap_err();
        assert!(matches!(err, AuditStoreError::Rejected(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn query_is_newest_first_and_filtered() {
        let store = InMemoryAuditStore::new();
        let first = store.insert(entry(AuditAction::Create, AuditEntityType::Aluno)).await.unwrap();
        store.insert(entry(AuditAction::Update, AuditEntityType::Nota)).await.unwrap();
        let third = store.insert(entry(AuditAction::Create, AuditEntityType::Aluno)).await.unwrap();

        let created = store
            .query(&AuditQuery::default().with_action(AuditAction::Create))
            .await
            .unwrap();
        assert_eq!(created.iter().map(|e| e.id).collect::<Vec<_>>(), vec![third.id, first.id]);

        let notas = store
            .query(&AuditQuery::default().with_entity_type(AuditEntityType::Nota))
            .await
            .unwrap();
        assert_eq!(notas.len(), 1);
        assert_eq!(notas[0].action, AuditAction::Update);
    }

    #[tokio::test]
    async fn query_limit_is_always_applied() {
        let store = InMemoryAuditStore::new();
        for _ in 0..(DEFAULT_AUDIT_QUERY_LIMIT + 5) {
            store.insert(entry(AuditAction::Login, AuditEntityType::User)).await.unwrap();
        }

        let defaulted = store.query(&AuditQuery::default()).await.unwrap();
        assert_eq!(defaulted.len(), DEFAULT_AUDIT_QUERY_LIMIT);

        let limited = store.query(&AuditQuery::default().with_limit(3)).await.unwrap();
        assert_eq!(limited.len(), 3);
    }
}
