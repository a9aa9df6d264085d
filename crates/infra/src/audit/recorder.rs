//! Fire-and-forget audit recorder and its background writer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use campus_auth::{Actor, AuditEvent, AuditLogEntry, AuditQuery, NewAuditLogEntry};

use crate::config::AuditConfig;
use crate::session::SessionStore;

use super::store::{AuditStore, AuditStoreError};

/// Writer statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuditWriterStats {
    /// Entries persisted.
    pub written: u64,
    /// Entries the store refused or failed to persist.
    pub failed: u64,
    /// Entries dropped before reaching the writer (queue full or closed).
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> AuditWriterStats {
        AuditWriterStats {
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Records privileged actions on behalf of the current session.
///
/// `record` never blocks and never fails: entries are queued for a background
/// writer, and anything that goes wrong afterwards is only logged. Cloning is
/// cheap; all clones feed the same writer.
#[derive(Clone)]
pub struct AuditRecorder {
    sessions: Arc<SessionStore>,
    store: Arc<dyn AuditStore>,
    queue: mpsc::Sender<NewAuditLogEntry>,
    counters: Arc<Counters>,
    max_query_limit: usize,
}

impl AuditRecorder {
    /// Start the writer task and return a recorder feeding it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        sessions: Arc<SessionStore>,
        store: Arc<dyn AuditStore>,
        config: &AuditConfig,
    ) -> (Self, AuditWriterHandle) {
        let (queue, rx) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());
        let shutdown = Arc::new(Notify::new());

        let join = tokio::spawn(writer_loop(
            Arc::clone(&store),
            rx,
            Arc::clone(&shutdown),
            Arc::clone(&counters),
        ));

        let recorder = Self {
            sessions,
            store,
            queue,
            counters: Arc::clone(&counters),
            max_query_limit: config.max_query_limit,
        };
        let handle = AuditWriterHandle {
            shutdown,
            join,
            counters,
        };
        (recorder, handle)
    }

    /// Queue an audit entry for the current session's actor.
    pub fn record(&self, event: AuditEvent) {
        let actor = Actor::from_session(&self.sessions.snapshot());
        let entry = NewAuditLogEntry::new(actor, event);

        match self.queue.try_send(entry) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = ?entry.action, entity_type = ?entry.entity_type, "audit queue full; entry dropped");
            }
            Err(mpsc::error::TrySendError::Closed(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(action = ?entry.action, entity_type = ?entry.entity_type, "audit writer stopped; entry dropped");
            }
        }
    }

    /// Matching entries, newest first. The limit defaults to 100 and is capped
    /// at the configured maximum.
    pub async fn query(&self, mut query: AuditQuery) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
        query.limit = Some(query.effective_limit(self.max_query_limit));
        self.store.query(&query).await
    }

    pub fn stats(&self) -> AuditWriterStats {
        self.counters.snapshot()
    }
}

/// Handle to the audit writer task.
#[derive(Debug)]
pub struct AuditWriterHandle {
    shutdown: Arc<Notify>,
    join: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl AuditWriterHandle {
    /// Stop accepting entries, persist whatever is already queued, and wait.
    pub async fn shutdown(self) -> AuditWriterStats {
        self.shutdown.notify_one();
        if let Err(e) = self.join.await {
            error!(error = %e, "audit writer task ended abnormally");
        }
        self.counters.snapshot()
    }

    pub fn stats(&self) -> AuditWriterStats {
        self.counters.snapshot()
    }
}

async fn writer_loop(
    store: Arc<dyn AuditStore>,
    mut rx: mpsc::Receiver<NewAuditLogEntry>,
    shutdown: Arc<Notify>,
    counters: Arc<Counters>,
) {
    debug!("audit writer started");
    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                rx.close();
                while let Some(entry) = rx.recv().await {
                    write_one(store.as_ref(), entry, &counters).await;
                }
                break;
            }
            received = rx.recv() => match received {
                Some(entry) => write_one(store.as_ref(), entry, &counters).await,
                None => break,
            }
        }
    }

    let stats = counters.snapshot();
    info!(written = stats.written, failed = stats.failed, dropped = stats.dropped, "audit writer stopped");
}

async fn write_one(store: &dyn AuditStore, entry: NewAuditLogEntry, counters: &Counters) {
    let action = entry.action;
    let entity_type = entry.entity_type;

    match store.insert(entry).await {
        Ok(persisted) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
            debug!(audit_id = %persisted.id, action = ?action, entity_type = ?entity_type, "audit entry written");
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(action = ?action, entity_type = ?entity_type, error = %e, "audit log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use campus_auth::{AuditAction, AuditEntityType, Identity, Profile, Session, UNKNOWN_ACTOR};
    use campus_core::UserId;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::audit::InMemoryAuditStore;

    /// Collects formatted log output in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap_or_else(PoisonError::into_inner)).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    struct BrokenStore;

    #[async_trait]
    impl AuditStore for BrokenStore {
        async fn insert(&self, _entry: NewAuditLogEntry) -> Result<AuditLogEntry, AuditStoreError> {
            Err(AuditStoreError::Unavailable("connection refused".to_string()))
        }

        async fn query(&self, _query: &AuditQuery) -> Result<Vec<AuditLogEntry>, AuditStoreError> {
            Err(AuditStoreError::Unavailable("connection refused".to_string()))
        }
    }

    fn signed_in(full_name: Option<&str>, email: Option<&str>) -> Arc<SessionStore> {
        let user_id = UserId::new();
        let identity = Identity::new(user_id, email.map(str::to_string));
        let profile = full_name.map(|name| Profile {
            user_id,
            full_name: name.to_string(),
            email: "perfil@escola.edu".to_string(),
            phone: None,
            institution_id: None,
        });
        let store = Arc::new(SessionStore::new());
        let generation = store.replace(Session::hydrating(identity.clone()));
        store.complete(generation, Session::ready(identity, profile, Default::default(), None));
        store
    }

    /// Stand-in business handler: the audit outcome must not affect its result.
    async fn update_student(recorder: &AuditRecorder, name: &str) -> Result<String, String> {
        let updated = format!("{name} (atualizado)");
        recorder.record(
            AuditEvent::new(AuditAction::Update, AuditEntityType::Aluno)
                .with_entity_name(name)
                .with_detail("campo", "telefone"),
        );
        Ok(updated)
    }

    #[tokio::test]
    async fn failing_store_never_reaches_the_business_action() {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (recorder, writer) = AuditRecorder::spawn(
            signed_in(Some("Maria Souza"), None),
            Arc::new(BrokenStore),
            &AuditConfig::default(),
        );

        let outcome = update_student(&recorder, "João").await;
        let stats = writer.shutdown().await;

        assert_eq!(outcome, Ok("João (atualizado)".to_string()));
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.written, 0);
        assert_eq!(logs.contents().matches("audit log write failed").count(), 1);
    }

    #[tokio::test]
    async fn entry_carries_actor_and_details() {
        let store = InMemoryAuditStore::arc();
        let (recorder, writer) = AuditRecorder::spawn(
            signed_in(Some("Maria Souza"), Some("maria@escola.edu")),
            store.clone(),
            &AuditConfig::default(),
        );

        update_student(&recorder, "João").await.unwrap();
        writer.shutdown().await;

        let entries = recorder.query(AuditQuery::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.actor_name, "Maria Souza");
        assert!(entry.actor_user_id.is_some());
        assert_eq!(entry.action, AuditAction::Update);
        assert_eq!(entry.entity_name.as_deref(), Some("João"));
        assert_eq!(entry.details["campo"], "telefone");
    }

    #[tokio::test]
    async fn actor_falls_back_to_email_then_unknown() {
        let store = InMemoryAuditStore::arc();
        let (by_email, writer) = AuditRecorder::spawn(
            signed_in(None, Some("maria@escola.edu")),
            store.clone(),
            &AuditConfig::default(),
        );
        by_email.record(AuditEvent::new(AuditAction::Login, AuditEntityType::User));
        writer.shutdown().await;

        let (anonymous, writer) = AuditRecorder::spawn(
            Arc::new(SessionStore::new()),
            store.clone(),
            &AuditConfig::default(),
        );
        anonymous.record(AuditEvent::new(AuditAction::Logout, AuditEntityType::User));
        writer.shutdown().await;

        let names: Vec<_> = anonymous
            .query(AuditQuery::default())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.actor_name)
            .collect();
        assert_eq!(names, vec![UNKNOWN_ACTOR.to_string(), "maria@escola.edu".to_string()]);
    }

    #[tokio::test]
    async fn full_queue_drops_without_blocking() {
        let store = InMemoryAuditStore::arc();
        let config = AuditConfig {
            queue_capacity: 1,
            ..AuditConfig::default()
        };
        let (recorder, writer) = AuditRecorder::spawn(signed_in(Some("Ana"), None), store.clone(), &config);

        // The writer cannot run until this task yields, so the second entry
        // finds the single slot taken.
        recorder.record(AuditEvent::new(AuditAction::Create, AuditEntityType::Curso));
        recorder.record(AuditEvent::new(AuditAction::Create, AuditEntityType::Turma));

        let stats = writer.shutdown().await;
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.written, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn recording_after_shutdown_is_dropped() {
        let (recorder, writer) = AuditRecorder::spawn(
            signed_in(Some("Ana"), None),
            InMemoryAuditStore::arc(),
            &AuditConfig::default(),
        );
        writer.shutdown().await;

        recorder.record(AuditEvent::new(AuditAction::Delete, AuditEntityType::Nota));
        assert_eq!(recorder.stats().dropped, 1);
    }

    #[tokio::test]
    async fn query_limit_is_capped_by_config() {
        let store = InMemoryAuditStore::arc();
        let config = AuditConfig {
            max_query_limit: 2,
            ..AuditConfig::default()
        };
        let (recorder, writer) = AuditRecorder::spawn(signed_in(Some("Ana"), None), store, &config);
        for _ in 0..5 {
            recorder.record(AuditEvent::new(AuditAction::Restore, AuditEntityType::Documento));
        }
        writer.shutdown().await;

        let entries = recorder
            .query(AuditQuery::default().with_limit(50))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }
}
