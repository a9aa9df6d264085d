//! End-to-end walkthrough over the in-memory adapters.
//!
//! Provisions a tenant as a platform operator, signs in as its admin, prints
//! route decisions and records an audit entry.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio::sync::broadcast;

use campus_auth::{
    AuditAction, AuditEntityType, AuditEvent, AuditQuery, Credentials, Profile, Role, Route,
    Session, SessionState, choose_home,
};
use campus_core::UserId;
use campus_infra::{
    AuditRecorder, CoreConfig, InMemoryAuditStore, InMemoryDirectory, InMemoryIdentityProvider,
    InMemoryProvisioner, ProvisionInstitution, ProvisioningService, SessionManager, SessionStore,
};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

const SHOWCASE_ROUTES: [Route; 6] = [
    Route::PlatformOverview,
    Route::StaffDashboard,
    Route::Alunos,
    Route::Notas,
    Route::Usuarios,
    Route::Perfil,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    campus_observability::init();
    let config = CoreConfig::from_env().context("loading configuration")?;

    let provider = Arc::new(InMemoryIdentityProvider::new());
    let directory = Arc::new(InMemoryDirectory::new());
    let sessions = Arc::new(SessionStore::new());
    let manager = Arc::new(SessionManager::new(provider.clone(), directory.clone(), sessions.clone()));
    let (audit, writer) = AuditRecorder::spawn(sessions.clone(), InMemoryAuditStore::arc(), &config.audit);
    let listener = manager.start().context("starting auth listener")?;

    seed_operator(&provider, &directory);

    // Platform operator creates a tenant.
    sign_in_and_settle(&manager, "ops@campus.dev", "operador").await?;
    print_session("platform operator", &manager.session());

    let provisioning = ProvisioningService::new(
        sessions.clone(),
        Arc::new(InMemoryProvisioner::new(directory.clone(), provider.clone())),
        audit.clone(),
    );
    let provisioned = provisioning
        .provision(ProvisionInstitution {
            institution_name: "Escola Modelo".to_string(),
            admin_full_name: "Paula Lima".to_string(),
            admin_email: "paula@escolamodelo.edu.br".to_string(),
            admin_password: "primeiro-acesso".to_string(),
        })
        .await
        .context("provisioning demo institution")?;
    println!("provisioned '{}' ({})", provisioned.institution.name, provisioned.institution.id);

    if let Some(revocation) = manager.sign_out() {
        revocation.await.context("revocation task panicked")?;
    }

    // The tenant admin signs in and uses the back office.
    sign_in_and_settle(&manager, "paula@escolamodelo.edu.br", "primeiro-acesso").await?;
    print_session("tenant admin", &manager.session());

    audit.record(
        AuditEvent::new(AuditAction::Update, AuditEntityType::Aluno)
            .with_entity_name("João Pereira")
            .with_detail("campo", "telefone"),
    );

    // Suspending the tenant locks its members out on their next session.
    directory.set_institution_active(provisioned.institution.id, false);
    if let Some(revocation) = manager.sign_out() {
        revocation.await.context("revocation task panicked")?;
    }
    sign_in_and_settle(&manager, "paula@escolamodelo.edu.br", "primeiro-acesso").await?;
    print_session("tenant admin (suspended institution)", &manager.session());

    listener.shutdown().await;
    let stats = writer.shutdown().await;
    println!("audit writer: {} written, {} failed, {} dropped", stats.written, stats.failed, stats.dropped);

    for entry in audit.query(AuditQuery::default()).await.context("querying audit log")? {
        println!(
            "  {} {:?} {:?} {} by {}",
            entry.created_at.format("%H:%M:%S%.3f"),
            entry.action,
            entry.entity_type,
            entry.entity_name.unwrap_or_default(),
            entry.actor_name
        );
    }

    Ok(())
}

fn seed_operator(provider: &InMemoryIdentityProvider, directory: &InMemoryDirectory) {
    let user_id = UserId::new();
    provider.register("ops@campus.dev", "operador", user_id);
    directory.upsert_profile(Profile {
        user_id,
        full_name: "Operação Campus".to_string(),
        email: "ops@campus.dev".to_string(),
        phone: None,
        institution_id: None,
    });
    directory.set_roles(user_id, [Role::SuperAdmin.as_str()]);
}

async fn sign_in_and_settle(manager: &SessionManager, email: &str, password: &str) -> anyhow::Result<()> {
    let mut updates = manager.store().subscribe();
    manager
        .sign_in(&Credentials::new(email, password))
        .await
        .with_context(|| format!("signing in as {email}"))?;

    tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            match updates.recv().await {
                Ok(session) if session.state() == SessionState::Ready => return Ok(()),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => bail!("session store closed"),
            }
        }
    })
    .await
    .context("session did not settle in time")?
}

fn print_session(label: &str, session: &Session) {
    let roles: Vec<_> = session.roles.iter().map(|r| r.as_str()).collect();
    println!("== {label}: roles [{}], home {}", roles.join(", "), choose_home(session).path());
    for route in SHOWCASE_ROUTES {
        println!("   {:<24} {:?}", route.path(), route.authorize(session));
    }
}
