//! Audit trail records.
//!
//! Entries are append-only: the core creates them and never mutates or deletes
//! them. Identity and timestamp of a persisted entry are assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use campus_core::{AuditLogId, Entity, UserId};

use crate::Session;

/// Default number of entries returned by an audit query.
pub const DEFAULT_AUDIT_QUERY_LIMIT: usize = 100;

/// Actor name used when neither a profile name nor an account email is known.
pub const UNKNOWN_ACTOR: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    SoftDelete,
    Restore,
    Login,
    Logout,
    GenerateDocument,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntityType {
    Curso,
    Disciplina,
    Aluno,
    Turma,
    Nota,
    Documento,
    Requerimento,
    User,
    GeneratedDocument,
    Institution,
}

/// Who performed an audited action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: Option<UserId>,
    pub name: String,
}

impl Actor {
    /// Resolve the acting identity from the current session.
    ///
    /// Preference: profile full name, then raw account email, then `"Unknown"`.
    pub fn from_session(session: &Session) -> Self {
        let user_id = session.identity.as_ref().map(|i| i.user_id);

        let name = session
            .profile
            .as_ref()
            .map(|p| p.full_name.trim())
            .filter(|n| !n.is_empty())
            .or_else(|| {
                session
                    .identity
                    .as_ref()
                    .and_then(|i| i.email.as_deref())
                    .filter(|e| !e.is_empty())
            })
            .unwrap_or(UNKNOWN_ACTOR)
            .to_string();

        Self { user_id, name }
    }
}

/// A privileged action reported by a business handler.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Map<String, Value>,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity_type: AuditEntityType) -> Self {
        Self {
            action,
            entity_type,
            entity_id: None,
            entity_name: None,
            details: Map::new(),
        }
    }

    pub fn with_entity_id(mut self, id: impl ToString) -> Self {
        self.entity_id = Some(id.to_string());
        self
    }

    pub fn with_entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = Some(name.into());
        self
    }

    /// Details keep insertion order.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// An entry ready to be persisted (id and timestamp not yet assigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAuditLogEntry {
    pub actor_user_id: Option<UserId>,
    pub actor_name: String,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Map<String, Value>,
}

impl NewAuditLogEntry {
    pub fn new(actor: Actor, event: AuditEvent) -> Self {
        Self {
            actor_user_id: actor.user_id,
            actor_name: actor.name,
            action: event.action,
            entity_type: event.entity_type,
            entity_id: event.entity_id,
            entity_name: event.entity_name,
            details: event.details,
        }
    }

    /// Attach the store-assigned identity and timestamp.
    pub fn persisted(self, id: AuditLogId, created_at: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            actor_user_id: self.actor_user_id,
            actor_name: self.actor_name,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            details: self.details,
            created_at,
        }
    }
}

/// A persisted audit entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub actor_user_id: Option<UserId>,
    pub actor_name: String,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: Option<String>,
    pub entity_name: Option<String>,
    pub details: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl Entity for AuditLogEntry {
    type Id = AuditLogId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Audit query filters. Results are newest first and always limited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub entity_type: Option<AuditEntityType>,
    pub action: Option<AuditAction>,
    /// Defaults to [`DEFAULT_AUDIT_QUERY_LIMIT`].
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn with_entity_type(mut self, entity_type: AuditEntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    pub fn with_action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// The limit actually applied: the requested one (or the default), capped at `max`.
    pub fn effective_limit(&self, max: usize) -> usize {
        self.limit.unwrap_or(DEFAULT_AUDIT_QUERY_LIMIT).min(max)
    }

    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.entity_type.is_none_or(|t| t == entry.entity_type)
            && self.action.is_none_or(|a| a == entry.action)
    }
}
