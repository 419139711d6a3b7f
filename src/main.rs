//! auto-order-desk server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use auto_order_desk::api;
use auto_order_desk::app_state::AppState;
use auto_order_desk::config::{DeskConfig, DraftBackend};
use auto_order_desk::domain::EventBus;
use auto_order_desk::persistence::{DraftStore, MemoryDraftStore, PostgresDraftStore};
use auto_order_desk::remote::{HttpSearchBackend, HttpSimulationService, HttpTemplateStore};
use auto_order_desk::service::{LifecycleRegistry, SearchRegistry, SimulationController};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = DeskConfig::from_env().context("invalid LISTEN_ADDR")?;
    tracing::info!(addr = %config.listen_addr, "starting auto-order-desk");

    let drafts = build_draft_store(&config).await?;
    let event_bus = EventBus::new(config.event_bus_capacity);
    let client = reqwest::Client::new();

    let templates = Arc::new(LifecycleRegistry::new(
        Arc::new(HttpTemplateStore::new(
            client.clone(),
            config.template_service_url.clone(),
        )),
        drafts,
        event_bus.clone(),
        config.autosave_interval,
    ));
    let simulation = Arc::new(SimulationController::new(
        Arc::new(HttpSimulationService::new(
            client.clone(),
            config.simulation_service_url.clone(),
        )),
        event_bus.clone(),
    ));
    let search = Arc::new(SearchRegistry::new(
        Arc::new(HttpSearchBackend::new(client, config.search_service_url.clone())),
        config.search_debounce,
        config.search_min_chars,
    ));

    let app = api::build_app(AppState {
        templates,
        simulation,
        search,
        event_bus,
    });

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Installs the global subscriber. `LOG_FORMAT=json` selects JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn build_draft_store(config: &DeskConfig) -> anyhow::Result<Arc<dyn DraftStore>> {
    match config.draft_backend {
        DraftBackend::Memory => {
            tracing::info!("drafts kept in memory");
            Ok(Arc::new(MemoryDraftStore::new()))
        }
        DraftBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(&config.database_url)
                .await
                .context("connecting to the draft database")?;
            let store = PostgresDraftStore::new(pool);
            store.init_schema().await?;
            tracing::info!("drafts kept in PostgreSQL");
            Ok(Arc::new(store))
        }
    }
}
