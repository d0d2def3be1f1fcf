use crate::models::{MediaRequest, RequestStatus};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("request {0} not found")]
    RequestNotFound(i64),

    #[error("request store unavailable: {0}")]
    Unavailable(String),
}

/// Read and write access to requests, implemented by the persistence layer.
#[async_trait]
pub trait RequestStore: Send + Sync {
    /// All requests for a media in one variant, in stable creation order.
    async fn requests_for_media(
        &self,
        media_id: i64,
        is4k: bool,
    ) -> Result<Vec<MediaRequest>, StoreError>;

    /// Conditional single-row update: `status = APPROVED WHERE status = PENDING`.
    ///
    /// Returns `true` only if this call moved the row.
    async fn approve_if_pending(&self, request_id: i64) -> Result<bool, StoreError>;
}

/// Insertion-ordered request table held in memory.
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<Vec<MediaRequest>>,
    writes: AtomicUsize,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(requests: Vec<MediaRequest>) -> Self {
        Self {
            requests: RwLock::new(requests),
            writes: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self, request_id: i64) -> Option<MediaRequest> {
        self.requests
            .read()
            .await
            .iter()
            .find(|r| r.id == request_id)
            .cloned()
    }

    pub async fn all(&self) -> Vec<MediaRequest> {
        self.requests.read().await.clone()
    }

    /// Overwrite a request's status the way an administrator would.
    pub async fn set_status(&self, request_id: i64, status: RequestStatus) -> Result<(), StoreError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(StoreError::RequestNotFound(request_id))?;
        request.status = status;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Number of row updates performed so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn requests_for_media(
        &self,
        media_id: i64,
        is4k: bool,
    ) -> Result<Vec<MediaRequest>, StoreError> {
        Ok(self
            .requests
            .read()
            .await
            .iter()
            .filter(|r| r.media_id == media_id && r.is4k == is4k)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn approve_if_pending(&self, request_id: i64) -> Result<bool, StoreError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(StoreError::RequestNotFound(request_id))?;

        if request.status != RequestStatus::Pending {
            debug!(status = ?request.status, "Request no longer pending, leaving untouched");
            return Ok(false);
        }

        request.status = RequestStatus::Approved;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }
}
