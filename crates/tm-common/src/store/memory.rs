use std::sync::RwLock;

use tracing::instrument;

use super::{RequestPatch, Store, StoreError, TutorPatch};
use crate::{ParentRequest, TutorProfile};

#[derive(Debug, Default)]
struct Collections {
    requests: Vec<ParentRequest>,
    tutors: Vec<TutorProfile>,
}

/// プロセス内ストア（テスト・デモ用、永続化なし）
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new(requests: Vec<ParentRequest>, tutors: Vec<TutorProfile>) -> Self {
        Self {
            inner: RwLock::new(Collections { requests, tutors }),
        }
    }
}

impl Store for InMemoryStore {
    fn list_requests(&self) -> Result<Vec<ParentRequest>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.requests.clone())
    }

    fn list_tutors(&self) -> Result<Vec<TutorProfile>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.tutors.clone())
    }

    #[instrument(skip(self, request), fields(request_id = %request.id))]
    fn add_request(&self, request: ParentRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.requests.iter().any(|r| r.id == request.id) {
            return Err(StoreError::Duplicate {
                kind: "request",
                id: request.id,
            });
        }
        inner.requests.push(request);
        Ok(())
    }

    #[instrument(skip(self, tutor), fields(tutor_id = %tutor.user_id))]
    fn add_tutor(&self, tutor: TutorProfile) -> Result<(), StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        if inner.tutors.iter().any(|t| t.user_id == tutor.user_id) {
            return Err(StoreError::Duplicate {
                kind: "tutor",
                id: tutor.user_id,
            });
        }
        inner.tutors.push(tutor);
        Ok(())
    }

    #[instrument(skip(self, patch))]
    fn update_request(
        &self,
        id: &str,
        patch: &RequestPatch,
    ) -> Result<Option<ParentRequest>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.requests.iter_mut().find(|r| r.id == id).map(|request| {
            patch.apply(request);
            request.clone()
        }))
    }

    #[instrument(skip(self, patch))]
    fn update_tutor(
        &self,
        user_id: &str,
        patch: &TutorPatch,
    ) -> Result<Option<TutorProfile>, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        Ok(inner
            .tutors
            .iter_mut()
            .find(|t| t.user_id == user_id)
            .map(|tutor| {
                patch.apply(tutor);
                tutor.clone()
            }))
    }
}
