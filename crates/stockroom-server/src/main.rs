//! STOCKROOM Server — application entry point.

use stockroom_core::directory::DirectoryService;
use stockroom_core::models::user::{CreateUser, UserRole};
use stockroom_core::repository::UserRepository;
use stockroom_db::DbManager;
use stockroom_server::config::ServerConfig;
use stockroom_server::state::AppState;
use stockroom_server::upload::UploadStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("stockroom=info".parse().unwrap()),
        )
        .json()
        .init();

    info!("Starting STOCKROOM server...");

    let config = ServerConfig::from_env()?;

    let db = DbManager::connect(&config.db).await?;
    stockroom_db::run_migrations(db.client()).await?;

    let directory = match &config.directory_users_json {
        Some(json) => DirectoryService::from_json(json)?,
        None => DirectoryService::default(),
    };

    let state = AppState::new(
        db.client().clone(),
        config.auth.clone(),
        UploadStore::new(&config.upload_dir),
        directory,
    );

    if let Some(seed) = &config.seed_admin {
        seed_admin(&state, seed).await;
    }

    let app = stockroom_server::app(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("STOCKROOM server stopped.");
    Ok(())
}

/// Create the bootstrap administrator account unless the email is
/// already registered.
async fn seed_admin(state: &AppState, seed: &stockroom_server::config::SeedAdmin) {
    match state.users.get_by_email(&seed.email).await {
        Ok(Some(_)) => {
            info!(email = %seed.email, "seed admin already exists, skipping");
        }
        Ok(None) => {
            let result = state
                .users
                .create(CreateUser {
                    name: seed.name.clone(),
                    email: seed.email.clone(),
                    password: seed.password.clone(),
                    role: UserRole::Admin,
                    ad_account: None,
                })
                .await;
            match result {
                Ok(user) => info!(user_id = %user.id, email = %user.email, "seed admin created"),
                Err(e) => warn!(error = %e, "could not create seed admin"),
            }
        }
        Err(e) => warn!(error = %e, "seed admin lookup failed"),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install shutdown handler");
    }
}
