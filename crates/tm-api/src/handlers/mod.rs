pub mod dashboard;
pub mod health;
pub mod requests;
pub mod tutors;

use crate::error::ApiError;

/// Store 操作（ファイル I/O を含む）をブロッキングスレッドで実行する
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

#[cfg(test)]
pub(crate) mod fixtures {
    use axum::{Router, body::Body, http::Request, http::StatusCode};
    use chrono::{Duration, Utc};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tm_common::{Address, ParentRequest, TutorProfile, store::InMemoryStore};
    use tower::ServiceExt;

    pub fn parent_request() -> ParentRequest {
        ParentRequest {
            id: "req-1".into(),
            father_name: "Ravi".into(),
            mother_name: "Lakshmi".into(),
            subjects: vec!["Maths".into()],
            address: Address::new("Kondapur", Some("17.46, 78.36".into())),
            preferred_timings: "Evenings".into(),
            payment_min: Some("8000".into()),
            payment_max: Some("12000".into()),
            phone_number: "+91 98765 43210".into(),
            created_at: Utc::now(),
            ..ParentRequest::default()
        }
    }

    pub fn tutor(id: &str, salary: &str, address: &str, phone: &str, assigned: bool) -> TutorProfile {
        TutorProfile {
            user_id: id.into(),
            name: format!("Tutor {id}"),
            expected_salary: salary.into(),
            available_timings: "Evenings, Weekdays".into(),
            address: Address::new(address, None),
            phone_number: phone.into(),
            subjects: vec!["Maths".into()],
            assigned,
            created_at: Utc::now() - Duration::days(30),
            ..TutorProfile::default()
        }
    }

    /// req-1 に対して tutor-a が満点、tutor-b が給与不一致、tutor-c は割当済み
    pub fn seeded_store() -> InMemoryStore {
        InMemoryStore::new(
            vec![parent_request()],
            vec![
                tutor("tutor-a", "10000", "Kondapur Cross Roads", "+91 90000 00001", false),
                tutor("tutor-b", "20000", "Kondapur", "+91 90000 00002", false),
                tutor("tutor-c", "10000", "Kondapur", "+91 90000 00003", true),
            ],
        )
    }

    pub async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(json) => Body::from(json.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
