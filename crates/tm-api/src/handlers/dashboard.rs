use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;
use tm_common::{
    ParentRequest, TutorProfile,
    admin::{DashboardStats, assigned_pairs, dashboard_stats},
    notify::{parent_follow_up, tutor_follow_up},
};

use super::run_blocking;
use crate::SharedState;
use crate::error::ApiError;

pub async fn stats(State(state): State<SharedState>) -> Result<Json<DashboardStats>, ApiError> {
    let stats = run_blocking(move || Ok(dashboard_stats(state.store.as_ref(), Utc::now())?)).await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPairView {
    pub request: ParentRequest,
    pub tutor: TutorProfile,
    pub parent_link: String,
    pub tutor_link: String,
}

pub async fn assigned(
    State(state): State<SharedState>,
) -> Result<Json<Vec<AssignedPairView>>, ApiError> {
    let store = state.store.clone();
    let pairs = run_blocking(move || Ok(assigned_pairs(store.as_ref())?)).await?;

    let notification = &state.config.notification;
    let views = pairs
        .into_iter()
        .map(|pair| AssignedPairView {
            parent_link: parent_follow_up(notification, &pair.request, &pair.tutor).deep_link(),
            tutor_link: tutor_follow_up(notification, &pair.request, &pair.tutor).deep_link(),
            request: pair.request,
            tutor: pair.tutor,
        })
        .collect();

    Ok(Json(views))
}
