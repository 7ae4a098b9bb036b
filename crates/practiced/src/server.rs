//! HTTP server for practiced

use crate::routes;
use crate::sessions::SessionRegistry;
use anyhow::{Context, Result};
use axum::Router;
use practice_common::{
    CredentialStore, DbLocation, InventoryStore, PracticeConfig, PracticeDb, PracticeFlow,
    PracticeLog, QuestionGenerator, RewardCatalog,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers
pub struct AppState {
    pub credentials: CredentialStore,
    pub inventory: InventoryStore,
    pub log: PracticeLog,
    pub flow: PracticeFlow,
    pub sessions: SessionRegistry,
    pub start_time: Instant,
}

impl AppState {
    /// Open the database, load the reward catalog and wire the stores
    pub async fn open(config: &PracticeConfig) -> Result<Self> {
        config.validate()?;

        let location = DbLocation::from_config(config.storage.db_path.as_ref());
        let db = PracticeDb::open(location).await?;
        let catalog = RewardCatalog::load(config.rewards.catalog_path.as_deref())?;

        Self::from_parts(db, catalog, config)
    }

    pub fn from_parts(
        db: PracticeDb,
        catalog: RewardCatalog,
        config: &PracticeConfig,
    ) -> Result<Self> {
        let params = config
            .security
            .argon2_params()
            .context("Invalid [security] settings")?;

        let log = PracticeLog::new(db.clone());
        let inventory = InventoryStore::new(db.clone());
        let flow = PracticeFlow::new(
            log.clone(),
            Arc::new(catalog),
            QuestionGenerator::new(config.questions.max_draw_attempts),
        );

        Ok(Self {
            credentials: CredentialStore::new(db, params),
            inventory,
            log,
            flow,
            sessions: SessionRegistry::new(
                config.sessions.max_sessions,
                Duration::from_secs(config.sessions.idle_timeout_secs),
            ),
            start_time: Instant::now(),
        })
    }
}

/// Build the router with all routes and layers
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(routes::auth_routes())
        .merge(routes::practice_routes())
        .merge(routes::inventory_routes())
        .merge(routes::health_routes())
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, config: &PracticeConfig) -> Result<()> {
    let app = router(Arc::new(state), config.server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!("Listening on http://{}", config.server.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down gracefully");
        })
        .await?;
    Ok(())
}
