//! Blog recommender service
//!
//! Serves recommendations over HTTP from an in-memory store, optionally seeded
//! from a JSON snapshot (`RECOMMENDER__SEED_PATH`).

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use blog_recommender::server::{configure_routes, AppState};
use blog_recommender::{InMemoryStore, RecommendationService, ServiceConfig};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!("Starting blog recommender service");

    let store = match &config.seed_path {
        Some(path) => Arc::new(
            InMemoryStore::from_seed_file(path)
                .with_context(|| format!("Failed to load seed file {}", path.display()))?,
        ),
        None => Arc::new(InMemoryStore::new()),
    };

    let service = Arc::new(RecommendationService::new(
        store.clone(),
        config.recommender.clone(),
    ));
    let warmed = service.warm_cache();
    info!(users = warmed, "Initial recommendations computed");

    let state = web::Data::new(AppState::new(service, store));
    let (host, port) = config.bind_address();
    info!(%host, port, "Binding HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await?;

    Ok(())
}
