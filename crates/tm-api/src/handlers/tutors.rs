use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tm_common::{
    TutorProfile,
    admin::{recent_tutors as recent, set_tutor_availability},
    notify::{Notification, tutor_outreach, tutor_welcome},
    submission::{NewTutorProfile, submit_tutor_profile},
};

use super::run_blocking;
use crate::SharedState;
use crate::error::ApiError;

/// 講師 + 管理画面から開く WhatsApp リンク
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TutorWithLink {
    #[serde(flatten)]
    pub tutor: TutorProfile,
    pub message_link: String,
}

impl TutorWithLink {
    fn new(tutor: TutorProfile, message: Notification) -> Self {
        Self {
            message_link: message.deep_link(),
            tutor,
        }
    }
}

pub async fn list_tutors(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TutorWithLink>>, ApiError> {
    let store = state.store.clone();
    let tutors = run_blocking(move || Ok(store.list_tutors()?)).await?;

    let notification = &state.config.notification;
    Ok(Json(
        tutors
            .into_iter()
            .map(|tutor| {
                let message = tutor_outreach(notification, &tutor);
                TutorWithLink::new(tutor, message)
            })
            .collect(),
    ))
}

pub async fn recent_tutors(
    State(state): State<SharedState>,
) -> Result<Json<Vec<TutorWithLink>>, ApiError> {
    let store = state.store.clone();
    let tutors = run_blocking(move || Ok(recent(store.as_ref(), Utc::now())?)).await?;

    let notification = &state.config.notification;
    Ok(Json(
        tutors
            .into_iter()
            .map(|tutor| {
                let message = tutor_welcome(notification, &tutor);
                TutorWithLink::new(tutor, message)
            })
            .collect(),
    ))
}

pub async fn submit_tutor(
    State(state): State<SharedState>,
    Json(form): Json<NewTutorProfile>,
) -> Result<(StatusCode, Json<TutorWithLink>), ApiError> {
    let store = state.store.clone();
    let tutor =
        run_blocking(move || Ok(submit_tutor_profile(store.as_ref(), form, Utc::now())?)).await?;

    let welcome = tutor_welcome(&state.config.notification, &tutor);
    Ok((StatusCode::CREATED, Json(TutorWithLink::new(tutor, welcome))))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityBody {
    pub assigned: bool,
}

pub async fn set_availability(
    State(state): State<SharedState>,
    Path(tutor_id): Path<String>,
    Json(body): Json<AvailabilityBody>,
) -> Result<Json<TutorProfile>, ApiError> {
    let tutor = run_blocking(move || {
        set_tutor_availability(state.store.as_ref(), &tutor_id, body.assigned)?
            .ok_or_else(|| ApiError::NotFound(format!("tutor {tutor_id}")))
    })
    .await?;
    Ok(Json(tutor))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use tm_common::notify::OutboxDispatcher;

    use crate::handlers::fixtures::{seeded_store, send};
    use crate::{create_router, test_state};

    fn app() -> axum::Router {
        create_router(test_state(
            Arc::new(seeded_store()),
            Arc::new(OutboxDispatcher::default()),
        ))
    }

    fn tutor_form(user_id: &str) -> serde_json::Value {
        json!({
            "userId": user_id,
            "name": "Meena",
            "age": "29",
            "gender": "female",
            "qualification": "M.Sc",
            "hasExperience": true,
            "yearsOfExperience": "4",
            "address": "Madhapur",
            "availableTimings": "Weekends",
            "expectedSalary": "15000",
            "phoneNumber": "+91 91234 56789",
            "subjects": ["Chemistry"]
        })
    }

    #[tokio::test]
    async fn lists_tutors_with_outreach_links() {
        let (status, body) = send(&app(), "GET", "/api/tutors", None).await;
        assert_eq!(status, 200);

        let tutors = body.as_array().unwrap();
        assert_eq!(tutors.len(), 3);
        assert_eq!(tutors[0]["userId"], "tutor-a");
        assert!(
            tutors[0]["messageLink"]
                .as_str()
                .unwrap()
                .starts_with("https://wa.me/919000000001?text=Hello%20Tutor%20tutor-a")
        );
    }

    #[tokio::test]
    async fn submitted_tutor_appears_in_recent_list() {
        let app = app();

        let (status, created) = send(&app, "POST", "/api/tutors", Some(tutor_form("t-new"))).await;
        assert_eq!(status, 201);
        assert_eq!(created["assigned"], false);
        assert!(
            created["messageLink"]
                .as_str()
                .unwrap()
                .contains("Welcome%20Meena")
        );

        let (_, recent) = send(&app, "GET", "/api/tutors/recent", None).await;
        let ids: Vec<_> = recent
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["userId"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["t-new"]);

        let (status, body) = send(&app, "POST", "/api/tutors", Some(tutor_form("t-new"))).await;
        assert_eq!(status, 409);
        assert_eq!(body["code"], "conflict");
    }

    #[tokio::test]
    async fn toggles_availability() {
        let app = app();

        let (status, tutor) = send(
            &app,
            "POST",
            "/api/tutors/tutor-c/availability",
            Some(json!({ "assigned": false })),
        )
        .await;
        assert_eq!(status, 200);
        assert_eq!(tutor["assigned"], false);

        let (_, suggestions) = send(&app, "GET", "/api/requests/req-1/suggestions", None).await;
        assert_eq!(suggestions["candidates"].as_array().unwrap().len(), 3);

        let (status, _) = send(
            &app,
            "POST",
            "/api/tutors/ghost/availability",
            Some(json!({ "assigned": true })),
        )
        .await;
        assert_eq!(status, 404);
    }
}
