use actix_web::{web, HttpRequest, HttpResponse, Responder};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::AppState;
use crate::store::LikeToggle;
use crate::types::{PostId, PostSummary, UserId};

/// Optional list size, falls back to the configured default
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

/// Query parameters for anonymous recommendations
#[derive(Debug, Default, Deserialize)]
pub struct AnonymousQuery {
    /// Visitor address; the peer address is used when absent
    pub ip: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub count: usize,
    pub posts: Vec<PostSummary>,
}

impl From<Vec<PostSummary>> for RecommendationsResponse {
    fn from(posts: Vec<PostSummary>) -> Self {
        Self {
            count: posts.len(),
            posts,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LikeRequest {
    pub user_id: UserId,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub post_id: PostId,
    pub user_id: UserId,
    pub liked: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct VisitRequest {
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

fn resolve_limit(state: &AppState, limit: Option<usize>) -> usize {
    limit.unwrap_or_else(|| state.service.default_limit())
}

fn peer_ip(req: &HttpRequest) -> Option<String> {
    req.peer_addr().map(|addr| addr.ip().to_string())
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> HttpResponse {
    error!(error = %e, "{}", context);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "error": format!("{}: {}", context, e)
    }))
}

/// Run a recommendation query on the blocking pool
async fn blocking_recommendations<F>(query: F) -> HttpResponse
where
    F: FnOnce() -> Vec<PostSummary> + Send + 'static,
{
    match web::block(query).await {
        Ok(posts) => HttpResponse::Ok().json(RecommendationsResponse::from(posts)),
        Err(e) => internal_error("Recommendation task failed", e),
    }
}

/// GET /api/v1/recommendations/users/{user_id}
pub async fn recommend_for_user(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    let user_id = path.into_inner();
    let n = resolve_limit(&state, query.limit);
    let service = state.service.clone();

    blocking_recommendations(move || service.recommend_for_user(user_id, n)).await
}

/// GET /api/v1/recommendations/anonymous?ip=
pub async fn recommend_for_anonymous(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<AnonymousQuery>,
) -> impl Responder {
    let query = query.into_inner();
    let Some(ip) = query.ip.or_else(|| peer_ip(&req)) else {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Visitor address is required"
        }));
    };
    let n = resolve_limit(&state, query.limit);
    let service = state.service.clone();

    blocking_recommendations(move || service.recommend_for_anonymous(&ip, n)).await
}

/// GET /api/v1/posts/{post_id}/similar
pub async fn similar_posts(
    state: web::Data<AppState>,
    path: web::Path<PostId>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    let post_id = path.into_inner();
    let n = resolve_limit(&state, query.limit);
    let service = state.service.clone();

    blocking_recommendations(move || service.similar_to_post(post_id, n)).await
}

/// GET /api/v1/posts/popular
pub async fn popular_posts(
    state: web::Data<AppState>,
    query: web::Query<LimitQuery>,
) -> impl Responder {
    let n = resolve_limit(&state, query.limit);
    let service = state.service.clone();

    blocking_recommendations(move || service.popular(n)).await
}

/// POST /api/v1/posts/{post_id}/like - like a post, or unlike it when already liked
pub async fn toggle_like(
    state: web::Data<AppState>,
    path: web::Path<PostId>,
    body: web::Json<LikeRequest>,
) -> impl Responder {
    let post_id = path.into_inner();
    let user_id = body.user_id;

    match state.store.has_post(post_id) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Post {} not found", post_id)
            }))
        }
        Err(e) => return internal_error("Failed to look up post", e),
    }

    let outcome = match state.store.toggle_like(user_id, post_id) {
        Ok(outcome) => outcome,
        Err(e) => return internal_error("Failed to toggle like", e),
    };

    match outcome {
        LikeToggle::Created => state.service.on_like_created(user_id, post_id),
        LikeToggle::Removed => state.service.on_like_removed(user_id, post_id),
    }
    info!(post_id, user_id, ?outcome, "Like toggled");

    HttpResponse::Ok().json(LikeResponse {
        post_id,
        user_id,
        liked: outcome == LikeToggle::Created,
    })
}

/// POST /api/v1/posts/{post_id}/visit
pub async fn record_visit(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<PostId>,
    body: Option<web::Json<VisitRequest>>,
) -> impl Responder {
    let post_id = path.into_inner();
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let ip_address = body.ip_address.or_else(|| peer_ip(&req));

    match state.store.has_post(post_id) {
        Ok(true) => {}
        Ok(false) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Post {} not found", post_id)
            }))
        }
        Err(e) => return internal_error("Failed to look up post", e),
    }

    if let Err(e) = state.store.record_visit(post_id, body.user_id, ip_address) {
        return internal_error("Failed to record visit", e);
    }
    state.service.on_visit_recorded(post_id, body.user_id);

    HttpResponse::Created().json(serde_json::json!({
        "post_id": post_id,
        "user_id": body.user_id,
    }))
}

/// POST /api/v1/cache/flush
pub async fn flush_cache(state: web::Data<AppState>) -> impl Responder {
    state.service.flush_cache();
    HttpResponse::Ok().json(serde_json::json!({ "flushed": true }))
}
