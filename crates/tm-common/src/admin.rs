use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::{
    ParentRequest, RequestStatus, TutorProfile,
    store::{Store, StoreError, TutorPatch},
};

/// 「新着講師」とみなす期間
pub const RECENT_TUTOR_DAYS: i64 = 7;

/// 未処理（pending）の依頼一覧
pub fn pending_requests<S: Store + ?Sized>(store: &S) -> Result<Vec<ParentRequest>, StoreError> {
    Ok(store
        .list_requests()?
        .into_iter()
        .filter(|r| r.status == RequestStatus::Pending)
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedPair {
    pub request: ParentRequest,
    pub tutor: TutorProfile,
}

/// approved の依頼と担当講師の組。講師が見つからない依頼は除外する。
pub fn assigned_pairs<S: Store + ?Sized>(store: &S) -> Result<Vec<AssignedPair>, StoreError> {
    let tutors = store.list_tutors()?;

    Ok(store
        .list_requests()?
        .into_iter()
        .filter(|r| r.status == RequestStatus::Approved)
        .filter_map(|request| {
            let tutor_id = request.assigned_tutor_id.as_deref()?;
            match tutors.iter().find(|t| t.user_id == tutor_id) {
                Some(tutor) => Some(AssignedPair {
                    tutor: tutor.clone(),
                    request,
                }),
                None => {
                    warn!(request_id = %request.id, tutor_id, "assigned tutor missing from store");
                    None
                }
            }
        })
        .collect())
}

pub fn is_recent(tutor: &TutorProfile, now: DateTime<Utc>) -> bool {
    tutor.created_at > now - Duration::days(RECENT_TUTOR_DAYS)
}

/// 直近7日以内に登録された講師
pub fn recent_tutors<S: Store + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<Vec<TutorProfile>, StoreError> {
    Ok(store
        .list_tutors()?
        .into_iter()
        .filter(|t| is_recent(t, now))
        .collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_requests: usize,
    pub pending_requests: usize,
    pub approved_requests: usize,
    pub completed_requests: usize,
    pub assigned_tutors: usize,
    pub available_tutors: usize,
    pub new_tutors: usize,
}

pub fn dashboard_stats<S: Store + ?Sized>(
    store: &S,
    now: DateTime<Utc>,
) -> Result<DashboardStats, StoreError> {
    let requests = store.list_requests()?;
    let tutors = store.list_tutors()?;

    let count_status = |status: RequestStatus| requests.iter().filter(|r| r.status == status).count();

    Ok(DashboardStats {
        total_requests: requests.len(),
        pending_requests: count_status(RequestStatus::Pending),
        approved_requests: count_status(RequestStatus::Approved),
        completed_requests: count_status(RequestStatus::Completed),
        assigned_tutors: tutors.iter().filter(|t| t.assigned).count(),
        available_tutors: tutors.iter().filter(|t| !t.assigned).count(),
        new_tutors: tutors.iter().filter(|t| is_recent(t, now)).count(),
    })
}

/// 講師の空き状況を手動で切り替える（管理画面の "Mark as Available/Assigned"）。
///
/// 依頼側の assignedTutorId は触らないため、approved の依頼が参照している講師を
/// 空きに戻すと1講師が複数依頼に割り当たり得る。その場合は警告ログを出す。
#[instrument(skip(store))]
pub fn set_tutor_availability<S: Store + ?Sized>(
    store: &S,
    user_id: &str,
    assigned: bool,
) -> Result<Option<TutorProfile>, StoreError> {
    if !assigned {
        let referenced = store.list_requests()?.iter().any(|r| {
            r.status == RequestStatus::Approved && r.assigned_tutor_id.as_deref() == Some(user_id)
        });
        if referenced {
            warn!(tutor_id = user_id, "tutor marked available while still referenced by an approved request");
        }
    }

    store.update_tutor(user_id, &TutorPatch::assigned(assigned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, RequestPatch};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn request(id: &str, status: RequestStatus, tutor: Option<&str>) -> ParentRequest {
        ParentRequest {
            id: id.into(),
            status,
            assigned_tutor_id: tutor.map(str::to_string),
            ..ParentRequest::default()
        }
    }

    fn tutor(id: &str, assigned: bool, days_ago: i64) -> TutorProfile {
        TutorProfile {
            user_id: id.into(),
            assigned,
            created_at: now() - Duration::days(days_ago),
            ..TutorProfile::default()
        }
    }

    fn store() -> InMemoryStore {
        InMemoryStore::new(
            vec![
                request("req-1", RequestStatus::Pending, None),
                request("req-2", RequestStatus::Approved, Some("t-1")),
                request("req-3", RequestStatus::Completed, Some("t-2")),
                request("req-4", RequestStatus::Approved, Some("ghost")),
            ],
            vec![
                tutor("t-1", true, 30),
                tutor("t-2", true, 2),
                tutor("t-3", false, 1),
                tutor("t-4", false, 8),
            ],
        )
    }

    #[test]
    fn lists_only_pending_requests() {
        let pending = pending_requests(&store()).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "req-1");
    }

    #[test]
    fn joins_approved_requests_with_existing_tutors() {
        let pairs = assigned_pairs(&store()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].request.id, "req-2");
        assert_eq!(pairs[0].tutor.user_id, "t-1");
    }

    #[test]
    fn counts_dashboard_stats() {
        let stats = dashboard_stats(&store(), now()).unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                total_requests: 4,
                pending_requests: 1,
                approved_requests: 2,
                completed_requests: 1,
                assigned_tutors: 2,
                available_tutors: 2,
                new_tutors: 2,
            }
        );
    }

    #[test]
    fn recent_tutors_use_seven_day_window() {
        let ids: Vec<_> = recent_tutors(&store(), now())
            .unwrap()
            .into_iter()
            .map(|t| t.user_id)
            .collect();
        assert_eq!(ids, vec!["t-2", "t-3"]);
    }

    #[test]
    fn toggles_availability_without_touching_requests() {
        let store = store();
        let tutor = set_tutor_availability(&store, "t-1", false).unwrap().unwrap();
        assert!(!tutor.assigned);
        assert_eq!(
            store.find_request("req-2").unwrap().unwrap().assigned_tutor_id.as_deref(),
            Some("t-1")
        );

        assert!(set_tutor_availability(&store, "missing", true).unwrap().is_none());
    }

    #[test]
    fn approval_moves_request_out_of_pending() {
        let store = store();
        store
            .update_request("req-1", &RequestPatch::approve("t-3"))
            .unwrap();
        assert!(pending_requests(&store).unwrap().is_empty());
    }
}
