use axum::{body::Body, http::Request, http::StatusCode};
use std::sync::{Arc, atomic::Ordering};
use tm_common::{notify::OutboxDispatcher, store::InMemoryStore};
use tower::ServiceExt;

#[tokio::test]
async fn readyz_returns_service_unavailable_when_not_ready() {
    let state = tm_api::test_state(
        Arc::new(InMemoryStore::default()),
        Arc::new(OutboxDispatcher::default()),
    );
    state.readiness.store(false, Ordering::SeqCst);
    let app = tm_api::create_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
