use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tm_common::{
    ParentRequest,
    admin::pending_requests,
    assignment::{AssignmentReceipt, AssignmentTransaction},
    matching::{MatchCandidate, MatchScore, RankerConfig, SuggestionRanker},
    submission::{NewParentRequest, submit_parent_request},
};

use super::run_blocking;
use crate::SharedState;
use crate::error::ApiError;

const MAX_LIMIT: usize = 200;

pub async fn list_pending(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ParentRequest>>, ApiError> {
    let requests = run_blocking(move || Ok(pending_requests(state.store.as_ref())?)).await?;
    Ok(Json(requests))
}

pub async fn submit_request(
    State(state): State<SharedState>,
    Json(form): Json<NewParentRequest>,
) -> Result<(StatusCode, Json<ParentRequest>), ApiError> {
    let request =
        run_blocking(move || Ok(submit_parent_request(state.store.as_ref(), form, Utc::now())?))
            .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub min_score: Option<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionView {
    #[serde(flatten)]
    pub candidate: MatchCandidate,
    pub explanation: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionsResponse {
    pub request: ParentRequest,
    pub candidates: Vec<SuggestionView>,
}

pub async fn suggestions(
    State(state): State<SharedState>,
    Path(request_id): Path<String>,
    Query(query): Query<SuggestionQuery>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let ranker = SuggestionRanker::new(RankerConfig {
        min_score: query.min_score.unwrap_or(0).min(MatchScore::MAX),
        max_candidates: query.limit.map(|limit| limit.clamp(1, MAX_LIMIT)),
    });

    let (request, ranked) = run_blocking(move || {
        ranker
            .suggest_for(state.store.as_ref(), &request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("parent request {request_id}")))
    })
    .await?;

    let candidates = ranked
        .into_iter()
        .map(|candidate| SuggestionView {
            explanation: candidate.explanation.clone(),
            candidate,
        })
        .collect();

    Ok(Json(SuggestionsResponse {
        request,
        candidates,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub tutor_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignResponse {
    #[serde(flatten)]
    pub receipt: AssignmentReceipt,
    pub tutor_link: String,
    pub parent_link: String,
}

pub async fn assign(
    State(state): State<SharedState>,
    Path(request_id): Path<String>,
    Json(body): Json<AssignBody>,
) -> Result<Json<AssignResponse>, ApiError> {
    let tutor_id = body.tutor_id.trim().to_string();
    if tutor_id.is_empty() {
        return Err(ApiError::BadRequest("tutorId is required".into()));
    }

    let receipt = run_blocking(move || {
        let receipt = AssignmentTransaction::new(state.store.as_ref(), state.dispatcher.as_ref())
            .with_policy(state.config.assignment_policy)
            .with_notification_config(state.config.notification.clone())
            .commit_ids(&request_id, &tutor_id)?;
        Ok(receipt)
    })
    .await?;

    Ok(Json(AssignResponse {
        tutor_link: receipt.notifications.tutor.deep_link(),
        parent_link: receipt.notifications.parent.deep_link(),
        receipt,
    }))
}
