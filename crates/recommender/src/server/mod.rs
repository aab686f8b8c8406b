pub mod handlers;

use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;
use std::sync::Arc;

use crate::service::RecommendationService;
use crate::store::InMemoryStore;

/// Application state shared across all handlers
pub struct AppState {
    pub service: Arc<RecommendationService>,
    /// Write side for likes and visits
    pub store: Arc<InMemoryStore>,
}

impl AppState {
    pub fn new(service: Arc<RecommendationService>, store: Arc<InMemoryStore>) -> Self {
        Self { service, store }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

/// Health check endpoint
async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "recommender-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health)).service(
        web::scope("/api/v1")
            // Recommendation routes
            .route(
                "/recommendations/users/{user_id}",
                web::get().to(handlers::recommend_for_user),
            )
            .route(
                "/recommendations/anonymous",
                web::get().to(handlers::recommend_for_anonymous),
            )
            // Post routes
            .route("/posts/popular", web::get().to(handlers::popular_posts))
            .route(
                "/posts/{post_id}/similar",
                web::get().to(handlers::similar_posts),
            )
            .route("/posts/{post_id}/like", web::post().to(handlers::toggle_like))
            .route(
                "/posts/{post_id}/visit",
                web::post().to(handlers::record_visit),
            )
            // Admin routes
            .route("/cache/flush", web::post().to(handlers::flush_cache)),
    );
}
