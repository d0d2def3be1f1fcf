//! Maps transition events to the requests they concern.

use crate::models::{MediaRequest, RequestStatus, TransitionEvent};
use crate::store::{RequestStore, StoreError};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct Correlator {
    store: Arc<dyn RequestStore>,
}

impl Correlator {
    pub fn new(store: Arc<dyn RequestStore>) -> Self {
        Self { store }
    }

    /// Load the candidate requests for the event's media and variant and
    /// select the ones the event concerns.
    #[instrument(skip(self, event), fields(media_id = event.media().id, event = event.name()))]
    pub async fn correlate(&self, event: &TransitionEvent) -> Result<Vec<MediaRequest>, StoreError> {
        let candidates = self
            .store
            .requests_for_media(event.media().id, event.variant().is_4k())
            .await?;

        let selected = select_requests(event, &candidates);
        debug!(
            candidates = candidates.len(),
            selected = selected.len(),
            "Correlated event with requests"
        );
        Ok(selected)
    }
}

/// Pure selection over `candidates`, which must be in stable creation order.
///
/// Declined requests and requests of the other variant are never selected.
/// For [`TransitionEvent::AutoApprove`] only pending requests are returned.
pub fn select_requests(event: &TransitionEvent, candidates: &[MediaRequest]) -> Vec<MediaRequest> {
    let media = event.media();
    let eligible = candidates.iter().filter(|r| {
        r.media_id == media.id
            && r.variant() == event.variant()
            && r.status != RequestStatus::Declined
    });

    match event {
        TransitionEvent::MovieAvailable { .. } | TransitionEvent::AlbumAvailable { .. } => {
            eligible.cloned().collect()
        }
        TransitionEvent::AutoApprove { .. } => eligible
            .filter(|r| r.status == RequestStatus::Pending)
            .cloned()
            .collect(),
        TransitionEvent::NewEpisodes { season_numbers, .. } => eligible
            .filter(|r| !r.wanted_seasons(media).is_disjoint(season_numbers))
            .cloned()
            .collect(),
        TransitionEvent::SeasonsAvailable {
            season_numbers,
            available,
            ..
        } => {
            let eligible: Vec<&MediaRequest> = eligible.collect();
            let mut claimed: BTreeSet<u32> = BTreeSet::new();
            let mut selected: Vec<MediaRequest> = Vec::new();

            // Walk changed seasons in ascending order. The first complete request
            // containing a season claims all of its seasons; later requests that
            // overlap a claimed season are not notified for it.
            for season in season_numbers {
                if claimed.contains(season) {
                    continue;
                }

                let winner = eligible.iter().find(|r| {
                    let wanted = r.wanted_seasons(media);
                    wanted.contains(season) && wanted.is_subset(available)
                });

                if let Some(request) = winner {
                    claimed.extend(request.wanted_seasons(media));
                    if !selected.iter().any(|s| s.id == request.id) {
                        selected.push((*request).clone());
                    }
                }
            }

            selected
        }
    }
}
