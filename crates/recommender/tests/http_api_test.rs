//! HTTP API tests for the recommender service

use actix_web::{test, web, App};
use blog_recommender::server::{configure_routes, AppState};
use blog_recommender::{
    InMemoryStore, InteractionStore, Post, RecommendationService, RecommenderConfig,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;

fn seeded_state() -> (web::Data<AppState>, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    for (id, category) in [(1, "rust"), (2, "rust"), (3, "go"), (4, "go")] {
        store
            .add_post(Post {
                id,
                category: Some(category.to_string()),
                title: format!("Post {}", id),
                content_length: 800,
                created_at: Utc.with_ymd_and_hms(2024, 5, id as u32, 0, 0, 0).unwrap(),
            })
            .unwrap();
    }
    store.add_user(1).unwrap();

    let service = Arc::new(RecommendationService::new(
        store.clone(),
        RecommenderConfig::default(),
    ));
    (web::Data::new(AppState::new(service, store.clone())), store)
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(configure_routes)).await
    };
}

#[actix_web::test]
async fn test_health() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get().uri("/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "healthy");
}

#[actix_web::test]
async fn test_popular_respects_limit() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts/popular?limit=2")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["count"], 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_user_recommendations_default_limit() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/users/1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    // Four posts exist, fewer than the default limit of five
    assert_eq!(body["count"], 4);
}

#[actix_web::test]
async fn test_like_toggles_and_invalidates_cache() {
    let (state, store) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/users/1?limit=4")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::post()
        .uri("/api/v1/posts/2/like")
        .set_json(serde_json::json!({ "user_id": 1 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["liked"], true);
    assert_eq!(store.count_likes_for_post(2).unwrap(), 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/users/1?limit=4")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let ids: Vec<i64> = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert!(!ids.contains(&2));

    let req = test::TestRequest::post()
        .uri("/api/v1/posts/2/like")
        .set_json(serde_json::json!({ "user_id": 1 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["liked"], false);
}

#[actix_web::test]
async fn test_like_unknown_post_is_not_found() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts/42/like")
        .set_json(serde_json::json!({ "user_id": 1 }))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_anonymous_visit_shapes_anonymous_recommendations() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/api/v1/posts/3/visit")
        .set_json(serde_json::json!({ "ip_address": "198.51.100.4" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::get()
        .uri("/api/v1/recommendations/anonymous?ip=198.51.100.4&limit=1")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["posts"][0]["id"], 4);
    assert_eq!(
        body["posts"][0]["reason"],
        "Because you viewed other posts in go"
    );
}

#[actix_web::test]
async fn test_similar_unknown_post_is_empty() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts/99/similar")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["count"], 0);
}

#[actix_web::test]
async fn test_flush_cache() {
    let (state, _) = seeded_state();
    let app = app!(state);

    let req = test::TestRequest::get()
        .uri("/api/v1/posts/1/similar?limit=2")
        .to_request();
    test::call_service(&app, req).await;
    assert_eq!(state.service.cache().len(), 1);

    let req = test::TestRequest::post()
        .uri("/api/v1/cache/flush")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert!(resp.status().is_success());
    assert!(state.service.cache().is_empty());
}
