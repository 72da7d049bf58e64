//! Assignment transaction: commit an admin's tutor choice for a request.
//!
//! Order of effects is fixed:
//! 1. request -> `approved` with `assignedTutorId`
//! 2. tutor -> `assigned = true`
//! 3. tutor-facing and parent-facing notifications are dispatched
//!
//! Dispatch happens only after both record updates succeed, and a dispatch
//! failure never undoes them. Replaying the same (request, tutor) pair
//! re-applies identical fields and dispatches the notifications again.

use serde::Serialize;
use strum::{AsRefStr, EnumString};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    ParentRequest, RequestStatus, TutorProfile,
    notify::{
        AssignmentNotifications, NotificationConfig, NotificationDispatcher, Recipient,
        build_assignment_notifications,
    },
    store::{RequestPatch, Store, StoreError, TutorPatch},
};

/// 割当済み講師を再割当しようとしたときの扱い
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, AsRefStr, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AssignmentPolicy {
    /// 警告ログのみで続行する
    #[default]
    Lenient,
    /// 同じ組の再実行以外は TutorAlreadyAssigned で拒否する
    Strict,
}

impl AssignmentPolicy {
    pub fn from_env() -> Self {
        std::env::var("TM_ASSIGNMENT_POLICY")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum AssignmentError {
    #[error("parent request not found: {0}")]
    RequestNotFound(String),
    #[error("tutor not found: {0}")]
    TutorNotFound(String),
    #[error("request {request_id} is {status} and cannot be assigned to {tutor_id}")]
    InvalidTransition {
        request_id: String,
        status: &'static str,
        tutor_id: String,
    },
    #[error("tutor {0} is already assigned")]
    TutorAlreadyAssigned(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    pub recipient: Recipient,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 割当の結果（更新後レコード + 通知内容 + 送信結果）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentReceipt {
    pub request: ParentRequest,
    pub tutor: TutorProfile,
    pub notifications: AssignmentNotifications,
    pub dispatch: Vec<DispatchOutcome>,
    /// 同じ組での再実行だった場合 true
    pub replayed: bool,
}

pub struct AssignmentTransaction<'a, S: ?Sized, D: ?Sized> {
    store: &'a S,
    dispatcher: &'a D,
    policy: AssignmentPolicy,
    notification_config: NotificationConfig,
}

impl<'a, S, D> AssignmentTransaction<'a, S, D>
where
    S: Store + ?Sized,
    D: NotificationDispatcher + ?Sized,
{
    pub fn new(store: &'a S, dispatcher: &'a D) -> Self {
        Self {
            store,
            dispatcher,
            policy: AssignmentPolicy::default(),
            notification_config: NotificationConfig::default(),
        }
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_notification_config(mut self, config: NotificationConfig) -> Self {
        self.notification_config = config;
        self
    }

    /// 管理者が選んだ (依頼, 講師) を確定する。
    ///
    /// 呼び出し側が持つスナップショットではなく Store 上の現在値で判定する。
    pub fn commit(
        &self,
        request: &ParentRequest,
        tutor: &TutorProfile,
    ) -> Result<AssignmentReceipt, AssignmentError> {
        self.commit_ids(&request.id, &tutor.user_id)
    }

    #[instrument(skip(self), fields(policy = self.policy.as_ref()))]
    pub fn commit_ids(
        &self,
        request_id: &str,
        tutor_id: &str,
    ) -> Result<AssignmentReceipt, AssignmentError> {
        let current_request = self
            .store
            .find_request(request_id)?
            .ok_or_else(|| AssignmentError::RequestNotFound(request_id.to_string()))?;
        let current_tutor = self
            .store
            .find_tutor(tutor_id)?
            .ok_or_else(|| AssignmentError::TutorNotFound(tutor_id.to_string()))?;

        let replayed = check_transition(&current_request, tutor_id)?;

        if current_tutor.assigned && !replayed {
            match self.policy {
                AssignmentPolicy::Strict => {
                    return Err(AssignmentError::TutorAlreadyAssigned(tutor_id.to_string()));
                }
                AssignmentPolicy::Lenient => {
                    warn!(request_id, tutor_id, "assigning a tutor that is already assigned");
                }
            }
        }

        let updated_request = self
            .store
            .update_request(request_id, &RequestPatch::approve(tutor_id))?
            .ok_or_else(|| AssignmentError::RequestNotFound(request_id.to_string()))?;
        let updated_tutor = self
            .store
            .update_tutor(tutor_id, &TutorPatch::assigned(true))?
            .ok_or_else(|| AssignmentError::TutorNotFound(tutor_id.to_string()))?;

        info!(request_id, tutor_id, replayed, "tutor assigned");

        let notifications =
            build_assignment_notifications(&self.notification_config, &updated_request, &updated_tutor);
        let dispatch = dispatch_all(self.dispatcher, &notifications);

        Ok(AssignmentReceipt {
            request: updated_request,
            tutor: updated_tutor,
            notifications,
            dispatch,
            replayed,
        })
    }
}

/// pending -> approved のみ許可。approved で同じ講師なら再実行扱い（true）。
fn check_transition(request: &ParentRequest, tutor_id: &str) -> Result<bool, AssignmentError> {
    match request.status {
        RequestStatus::Pending => Ok(false),
        RequestStatus::Approved if request.assigned_tutor_id.as_deref() == Some(tutor_id) => {
            Ok(true)
        }
        status => Err(AssignmentError::InvalidTransition {
            request_id: request.id.clone(),
            status: status.as_str(),
            tutor_id: tutor_id.to_string(),
        }),
    }
}

/// 送信失敗は警告ログに残して結果に含めるだけ（割当は取り消さない）
pub fn dispatch_all<D: NotificationDispatcher + ?Sized>(
    dispatcher: &D,
    notifications: &AssignmentNotifications,
) -> Vec<DispatchOutcome> {
    notifications
        .iter()
        .map(|(recipient, notification)| match dispatcher.dispatch(notification) {
            Ok(()) => DispatchOutcome {
                recipient,
                delivered: true,
                error: None,
            },
            Err(err) => {
                warn!(recipient = recipient.as_ref(), error = %err, "notification dispatch failed");
                DispatchOutcome {
                    recipient,
                    delivered: false,
                    error: Some(err.to_string()),
                }
            }
        })
        .collect()
}
