//! Sign-in → hydration → route gating → audit, wired over the in-memory adapters.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use campus_auth::{
    AuditAction, AuditEntityType, AuditEvent, AuditQuery, AuthStateEvent, Credentials, Institution,
    Profile, Route, RouteDecision, Session, SessionState, SubscriptionStatus, authorize_path,
    choose_home,
};
use campus_core::{InstitutionId, UserId};
use campus_infra::{
    AuditRecorder, AuthListener, AuditWriterHandle, CoreConfig, InMemoryAuditStore, InMemoryDirectory,
    InMemoryIdentityProvider, SessionManager, SessionStore,
};

struct App {
    provider: Arc<InMemoryIdentityProvider>,
    directory: Arc<InMemoryDirectory>,
    manager: Arc<SessionManager>,
    audit: AuditRecorder,
    writer: AuditWriterHandle,
    listener: AuthListener,
    institution: Institution,
}

impl App {
    fn boot() -> Self {
        let provider = Arc::new(InMemoryIdentityProvider::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let sessions = Arc::new(SessionStore::new());
        let manager = Arc::new(SessionManager::new(provider.clone(), directory.clone(), sessions.clone()));
        let (audit, writer) =
            AuditRecorder::spawn(sessions, InMemoryAuditStore::arc(), &CoreConfig::default().audit);
        let listener = manager.start().unwrap();

        let institution = Institution {
            id: InstitutionId::new(),
            name: "Escola Modelo".to_string(),
            is_active: true,
            subscription_status: Some(SubscriptionStatus::Active),
        };
        directory.upsert_institution(institution.clone());

        Self {
            provider,
            directory,
            manager,
            audit,
            writer,
            listener,
            institution,
        }
    }

    fn member(&self, email: &str, full_name: &str, roles: &[&str], institution_id: Option<InstitutionId>) {
        let user_id = UserId::new();
        self.provider.register(email, "s3nha", user_id);
        self.directory.upsert_profile(Profile {
            user_id,
            full_name: full_name.to_string(),
            email: email.to_string(),
            phone: None,
            institution_id,
        });
        self.directory.set_roles(user_id, roles.iter().copied());
    }

    async fn sign_in(&self, email: &str) -> Arc<Session> {
        let mut updates = self.manager.store().subscribe();
        self.manager
            .sign_in(&Credentials::new(email, "s3nha"))
            .await
            .unwrap();
        settle(&mut updates, SessionState::Ready).await
    }

    async fn shutdown(self) {
        self.listener.shutdown().await;
        self.writer.shutdown().await;
    }
}

async fn settle(updates: &mut broadcast::Receiver<Arc<Session>>, state: SessionState) -> Arc<Session> {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let session = updates.recv().await.unwrap();
            if session.state() == state {
                return session;
            }
        }
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn secretaria_reaches_student_records_but_not_user_admin() {
    let app = App::boot();
    app.member("sec@escola.edu", "Sandra Reis", &["secretaria"], Some(app.institution.id));

    let session = app.sign_in("sec@escola.edu").await;

    assert_eq!(Route::Alunos.authorize(&session), RouteDecision::Allowed);
    assert_eq!(Route::Usuarios.authorize(&session), RouteDecision::Forbidden);
    assert_eq!(authorize_path(&session, "/perfil/"), Some(RouteDecision::Allowed));
    assert_eq!(authorize_path(&session, "/nao-existe"), None);
    assert_eq!(choose_home(&session), Route::StaffDashboard);

    app.shutdown().await;
}

#[tokio::test]
async fn suspended_tenant_locks_out_members_but_not_platform_operators() {
    let app = App::boot();
    app.directory.set_institution_active(app.institution.id, false);
    app.member("admin@escola.edu", "Paula Lima", &["admin"], Some(app.institution.id));
    app.member("ops@campus.dev", "Operação", &["super_admin"], Some(app.institution.id));

    let admin = app.sign_in("admin@escola.edu").await;
    assert_eq!(Route::Alunos.authorize(&admin), RouteDecision::InstitutionInactive);
    assert_eq!(Route::Perfil.authorize(&admin), RouteDecision::InstitutionInactive);

    let mut updates = app.manager.store().subscribe();
    app.manager.sign_out().expect("token to revoke").await.unwrap();
    settle(&mut updates, SessionState::Anonymous).await;

    let operator = app.sign_in("ops@campus.dev").await;
    assert_eq!(Route::Alunos.authorize(&operator), RouteDecision::Allowed);
    assert_eq!(Route::Institutions.authorize(&operator), RouteDecision::Allowed);
    assert_eq!(choose_home(&operator), Route::PlatformOverview);

    app.shutdown().await;
}

#[tokio::test]
async fn sign_out_returns_to_login_and_blocks_routes() {
    let app = App::boot();
    app.member("prof@escola.edu", "Carlos Alves", &["professor"], Some(app.institution.id));
    app.sign_in("prof@escola.edu").await;

    let _revocation = app.manager.sign_out();

    let session = app.manager.session();
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(Route::Notas.authorize(&session), RouteDecision::Unauthenticated);
    assert_eq!(choose_home(&session), Route::Login);

    app.shutdown().await;
}

#[tokio::test]
async fn audit_entries_are_attributed_to_the_signed_in_user() {
    let app = App::boot();
    app.member("sec@escola.edu", "Sandra Reis", &["secretaria"], Some(app.institution.id));
    app.sign_in("sec@escola.edu").await;

    app.audit.record(
        AuditEvent::new(AuditAction::SoftDelete, AuditEntityType::Aluno)
            .with_entity_id("42")
            .with_entity_name("João Pereira"),
    );
    app.audit.record(AuditEvent::new(AuditAction::GenerateDocument, AuditEntityType::GeneratedDocument));

    let audit = app.audit.clone();
    app.shutdown().await;

    let entries = audit.query(AuditQuery::default()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.actor_name == "Sandra Reis"));
    assert!(entries.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let deletions = audit
        .query(AuditQuery::default().with_action(AuditAction::SoftDelete))
        .await
        .unwrap();
    assert_eq!(deletions.len(), 1);
    assert_eq!(deletions[0].entity_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn token_expiry_from_the_provider_clears_the_session() {
    let app = App::boot();
    app.member("aluno@escola.edu", "Bia Costa", &["aluno"], Some(app.institution.id));
    let session = app.sign_in("aluno@escola.edu").await;
    assert_eq!(choose_home(&session), Route::StudentPanel);

    let mut updates = app.manager.store().subscribe();
    app.provider.emit(AuthStateEvent::SignedOut { access_token: None });
    let cleared = settle(&mut updates, SessionState::Anonymous).await;

    assert!(cleared.roles.is_empty());
    assert!(!app.manager.is_aluno());

    app.shutdown().await;
}
