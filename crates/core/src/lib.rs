//! `campus-core`: foundation building blocks shared by the authorization core.
//!
//! This crate contains **pure** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AuditLogId, InstitutionId, UserId};
