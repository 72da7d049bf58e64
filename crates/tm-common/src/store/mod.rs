//! Persistence seam for parent requests and tutor profiles.
//!
//! The matching core only talks to [`Store`]; the HTTP service picks the
//! backend at startup ([`InMemoryStore`] or [`JsonFileStore`]).

pub mod json_file;
pub mod memory;

use thiserror::Error;

use crate::{ParentRequest, RequestStatus, TutorProfile};

pub use json_file::JsonFileStore;
pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate {kind} id: {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("store lock poisoned")]
    Poisoned,
}

/// ParentRequest の部分更新。None のフィールドは触らない。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub status: Option<RequestStatus>,
    pub assigned_tutor_id: Option<String>,
}

impl RequestPatch {
    pub fn approve(tutor_id: impl Into<String>) -> Self {
        Self {
            status: Some(RequestStatus::Approved),
            assigned_tutor_id: Some(tutor_id.into()),
        }
    }

    pub fn apply(&self, request: &mut ParentRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(tutor_id) = &self.assigned_tutor_id {
            request.assigned_tutor_id = Some(tutor_id.clone());
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TutorPatch {
    pub assigned: Option<bool>,
}

impl TutorPatch {
    pub fn assigned(value: bool) -> Self {
        Self {
            assigned: Some(value),
        }
    }

    pub fn apply(&self, tutor: &mut TutorProfile) {
        if let Some(assigned) = self.assigned {
            tutor.assigned = assigned;
        }
    }
}

/// Read-all / append / partial-update-by-id over the two collections.
///
/// Updates return the merged record, or `None` when the id is unknown.
pub trait Store: Send + Sync {
    fn list_requests(&self) -> Result<Vec<ParentRequest>, StoreError>;

    fn list_tutors(&self) -> Result<Vec<TutorProfile>, StoreError>;

    fn add_request(&self, request: ParentRequest) -> Result<(), StoreError>;

    fn add_tutor(&self, tutor: TutorProfile) -> Result<(), StoreError>;

    fn update_request(
        &self,
        id: &str,
        patch: &RequestPatch,
    ) -> Result<Option<ParentRequest>, StoreError>;

    fn update_tutor(
        &self,
        user_id: &str,
        patch: &TutorPatch,
    ) -> Result<Option<TutorProfile>, StoreError>;

    fn find_request(&self, id: &str) -> Result<Option<ParentRequest>, StoreError> {
        Ok(self.list_requests()?.into_iter().find(|r| r.id == id))
    }

    fn find_tutor(&self, user_id: &str) -> Result<Option<TutorProfile>, StoreError> {
        Ok(self
            .list_tutors()?
            .into_iter()
            .find(|t| t.user_id == user_id))
    }
}
