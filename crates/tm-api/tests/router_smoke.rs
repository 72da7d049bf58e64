use axum::{Router, body::Body, http::Request, http::StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::sync::Arc;
use tm_common::{
    RequestStatus,
    notify::OutboxDispatcher,
    store::{JsonFileStore, Store},
};
use tower::ServiceExt;

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |json| Body::from(json.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn livez_healthy_and_unknown_routes_404() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let app = tm_api::create_router(tm_api::test_state(
        store,
        Arc::new(OutboxDispatcher::default()),
    ));

    let (status, body) = call(&app, "GET", "/livez", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = call(&app, "GET", "/api/queue/jobs", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn submit_match_assign_persists_to_json_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonFileStore::open(dir.path()).unwrap());
    let outbox = Arc::new(OutboxDispatcher::default());
    let app = tm_api::create_router(tm_api::test_state(store, outbox.clone()));

    for (id, salary) in [("tutor-a", "10000"), ("tutor-b", "20000")] {
        let (status, _) = call(
            &app,
            "POST",
            "/api/tutors",
            Some(json!({
                "userId": id,
                "name": format!("Tutor {id}"),
                "age": "30",
                "qualification": "B.Ed",
                "address": "Kondapur Cross Roads",
                "availableTimings": "Evenings, Weekdays",
                "expectedSalary": salary,
                "phoneNumber": "9000000001",
                "subjects": ["Maths"]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, request) = call(
        &app,
        "POST",
        "/api/requests",
        Some(json!({
            "fatherName": "Ravi",
            "motherName": "Lakshmi",
            "numberOfChildren": "1",
            "syllabus": "CBSE",
            "subjects": ["Maths"],
            "preferredGender": "",
            "address": "Kondapur",
            "preferredTimings": "Evenings",
            "paymentMin": "8000",
            "paymentMax": "12000",
            "phoneNumber": "9876543210"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let request_id = request["id"].as_str().unwrap().to_string();
    assert_eq!(request["preferredGender"], "any");

    let (_, suggestions) = call(
        &app,
        "GET",
        &format!("/api/requests/{request_id}/suggestions"),
        None,
    )
    .await;
    let scores: Vec<_> = suggestions["candidates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| (c["userId"].as_str().unwrap().to_string(), c["matchScore"].as_u64().unwrap()))
        .collect();
    assert_eq!(
        scores,
        vec![("tutor-a".to_string(), 3), ("tutor-b".to_string(), 2)]
    );

    let (status, receipt) = call(
        &app,
        "POST",
        &format!("/api/requests/{request_id}/assign"),
        Some(json!({ "tutorId": "tutor-a" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["dispatch"].as_array().unwrap().len(), 2);
    assert_eq!(outbox.sent().len(), 2);

    let reopened = JsonFileStore::open(dir.path()).unwrap();
    let stored = reopened.find_request(&request_id).unwrap().unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert_eq!(stored.assigned_tutor_id.as_deref(), Some("tutor-a"));
    assert!(reopened.find_tutor("tutor-a").unwrap().unwrap().assigned);
    assert!(!reopened.find_tutor("tutor-b").unwrap().unwrap().assigned);
}
