use crate::models::{MediaRequest, RequestStatus};
use crate::store::{RequestStore, StoreError};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Outcome of [`ProgressionWriter::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Approved,
    AlreadyApproved,
    /// Not pending, or the row changed underneath us.
    Skipped,
}

/// Moves requests from PENDING to APPROVED when their media becomes available.
pub struct ProgressionWriter {
    store: Arc<dyn RequestStore>,
}

impl ProgressionWriter {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(request_id = request.id, media_id = request.media_id))]
    pub async fn advance(&self, request: &MediaRequest) -> Result<Advance, StoreError> {
        match request.status {
            RequestStatus::Approved => Ok(Advance::AlreadyApproved),
            RequestStatus::Pending => {
                if self.store.approve_if_pending(request.id).await? {
                    info!("Request auto-approved");
                    Ok(Advance::Approved)
                } else {
                    debug!("Request changed concurrently, leaving it alone");
                    Ok(Advance::Skipped)
                }
            }
            _ => Ok(Advance::Skipped),
        }
    }
}
