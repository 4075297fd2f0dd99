use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use axum::Router;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

use leadline_core::config::{AppConfig, ConfigError, LoadOptions};
use leadline_core::dialogue::DialogueEngine;
use leadline_core::domain::lead::ChatId;
use leadline_core::intake::LeadIngestService;
use leadline_core::notify::OperatorNotifier;
use leadline_core::session::SessionStore;
use leadline_db::{connect_with_settings, migrations, DbPool, SqlLeadRepository};
use leadline_telegram::notifier::TelegramNotifier;
use leadline_telegram::router::UpdateRouter;
use leadline_telegram::transport::{ChatTransport, HttpChatTransport};

use crate::forms::{self, FormsState};
use crate::webhook::{self, WebhookState};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("chat transport initialization failed: {0}")]
    Transport(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    let transport: Arc<dyn ChatTransport> = Arc::new(
        HttpChatTransport::new(
            config.telegram.api_base_url.clone(),
            config.telegram.bot_token.clone(),
            Duration::from_secs(config.telegram.send_timeout_secs),
        )
        .map_err(|error| BootstrapError::Transport(error.to_string()))?,
    );

    let intake = LeadIngestService::new(Arc::new(SqlLeadRepository::new(db_pool.clone())));
    let notifier: Arc<dyn OperatorNotifier> = Arc::new(TelegramNotifier::new(
        transport.clone(),
        ChatId(config.telegram.operator_chat_id),
    ));
    let engine = Arc::new(DialogueEngine::new(
        SessionStore::new(),
        intake.clone(),
        notifier.clone(),
    ));
    let update_router = Arc::new(UpdateRouter::new(engine, transport));

    let api_router = api_router(&config, intake, notifier, update_router);

    Ok(Application { config, db_pool, api_router })
}

fn api_router(
    config: &AppConfig,
    intake: LeadIngestService,
    notifier: Arc<dyn OperatorNotifier>,
    update_router: Arc<UpdateRouter>,
) -> Router {
    Router::new()
        .merge(forms::router(FormsState { intake, notifier }))
        .merge(webhook::router(WebhookState {
            router: update_router,
            secret: config.telegram.webhook_secret.clone(),
        }))
        .layer(cors_layer(&config.site.allowed_origins))
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
