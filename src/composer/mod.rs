//! Builds user-facing notification payloads for correlated requests.

use crate::metadata::{LookupError, MediaMetadata, MetadataLookup};
use crate::models::{
    format_seasons, ExtraField, MediaKind, MediaRequest, NotificationCategory, NotificationPayload,
    TransitionEvent,
};
use std::sync::Arc;
use tracing::instrument;

const ELLIPSIS: char = '…';

pub struct Composer {
    metadata: Arc<dyn MetadataLookup>,
    synopsis_max_chars: usize,
}

impl Composer {
    pub fn new(metadata: Arc<dyn MetadataLookup>, synopsis_max_chars: usize) -> Self {
        Self {
            metadata,
            synopsis_max_chars,
        }
    }

    /// Compose the payload for a single request.
    pub async fn compose(
        &self,
        event: &TransitionEvent,
        request: &MediaRequest,
    ) -> Result<Option<NotificationPayload>, LookupError> {
        let metadata = self.lookup(event).await?;
        Ok(self.build(event, request, &metadata))
    }

    /// Compose payloads for every request of one event, fetching metadata once.
    ///
    /// A lookup failure fails the whole event; other events are unaffected.
    pub async fn compose_all(
        &self,
        event: &TransitionEvent,
        requests: &[MediaRequest],
    ) -> Result<Vec<NotificationPayload>, LookupError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let metadata = self.lookup(event).await?;
        Ok(requests
            .iter()
            .filter_map(|r| self.build(event, r, &metadata))
            .collect())
    }

    #[instrument(skip(self, event), fields(media_id = event.media().id, event = event.name()))]
    async fn lookup(&self, event: &TransitionEvent) -> Result<MediaMetadata, LookupError> {
        let media = event.media();
        self.metadata.fetch(&media.catalog_id, media.kind).await
    }

    /// Pure payload construction. `AutoApprove` has no notification.
    pub fn build(
        &self,
        event: &TransitionEvent,
        request: &MediaRequest,
        metadata: &MediaMetadata,
    ) -> Option<NotificationPayload> {
        let prefix = if event.variant().is_4k() { "4K " } else { "" };

        let (category, label, extra) = match event {
            TransitionEvent::MovieAvailable { .. } => (
                NotificationCategory::MovieAvailable,
                format!("{prefix}Movie Request Now Available"),
                Vec::new(),
            ),
            TransitionEvent::AlbumAvailable { .. } => (
                NotificationCategory::AlbumAvailable,
                "Album Request Now Available".to_string(),
                Vec::new(),
            ),
            TransitionEvent::SeasonsAvailable { media, .. } => (
                NotificationCategory::SeriesAvailable,
                format!("{prefix}Series Request Now Available"),
                vec![ExtraField {
                    name: "Requested Seasons".to_string(),
                    value: format_seasons(&request.wanted_seasons(media)),
                }],
            ),
            TransitionEvent::NewEpisodes { season_numbers, media, .. } => {
                let touched = request
                    .wanted_seasons(media)
                    .intersection(season_numbers)
                    .copied()
                    .collect();
                (
                    NotificationCategory::NewEpisode,
                    format!("{prefix}New Episodes Available"),
                    vec![ExtraField {
                        name: "Seasons With New Episodes".to_string(),
                        value: format_seasons(&touched),
                    }],
                )
            }
            TransitionEvent::AutoApprove { .. } => return None,
        };

        Some(NotificationPayload {
            notification_id: uuid::Uuid::new_v4(),
            category,
            event: label,
            media_id: event.media().id,
            request_id: request.id,
            is4k: event.variant().is_4k(),
            notify_user: request.requested_by.clone(),
            subject: subject(event.media().kind, metadata),
            message: truncate(&metadata.synopsis, self.synopsis_max_chars),
            image: metadata.artwork_url.clone(),
            extra,
        })
    }
}

fn subject(kind: MediaKind, metadata: &MediaMetadata) -> String {
    match kind {
        MediaKind::Album => match metadata.artist {
            Some(ref artist) => format!("{} by {}", metadata.title, artist),
            None => metadata.title.clone(),
        },
        MediaKind::Movie | MediaKind::Series => match metadata.release_year() {
            Some(year) => format!("{} ({})", metadata.title, year),
            None => metadata.title.clone(),
        },
    }
}

/// Truncate to at most `max_chars` characters including the trailing ellipsis,
/// cutting back to the last whitespace when there is one. Whitespace is kept
/// as given; only the cut position depends on it.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(1);
    let prefix: String = text.chars().take(keep).collect();
    // Only cut on whitespace when the next character does not already start a word break.
    let next_is_space = text.chars().nth(keep).is_some_and(char::is_whitespace);
    let cut = if next_is_space {
        prefix.as_str()
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(idx) => &prefix[..idx],
            None => prefix.as_str(),
        }
    };

    let mut out = cut.to_string();
    out.push(ELLIPSIS);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MediaSnapshot, RequestStatus, Variant};
    use crate::store::fixtures::request;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticLookup {
        metadata: MediaMetadata,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MetadataLookup for StaticLookup {
        async fn fetch(&self, _catalog_id: &str, _kind: MediaKind) -> Result<MediaMetadata, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.metadata.clone())
        }
    }

    struct FailingLookup;

    #[async_trait]
    impl MetadataLookup for FailingLookup {
        async fn fetch(&self, _catalog_id: &str, kind: MediaKind) -> Result<MediaMetadata, LookupError> {
            Err(LookupError::Unsupported(kind))
        }
    }

    fn matrix() -> MediaMetadata {
        MediaMetadata {
            title: "The Matrix".to_string(),
            release_date: Some("1999-03-30".to_string()),
            synopsis: "Set in the 22nd century, The Matrix tells the story of a computer hacker.".to_string(),
            artwork_url: Some("https://image.tmdb.org/t/p/w600_and_h900_bestv2/m.jpg".to_string()),
            artist: None,
        }
    }

    fn composer(metadata: Arc<dyn MetadataLookup>) -> Composer {
        Composer::new(metadata, 500)
    }

    #[test]
    fn truncate_cuts_on_word_boundary() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("hello wonderful world", 12), "hello…");
        assert_eq!(truncate("hello world again", 12), "hello world…");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert!(truncate(&"word ".repeat(200), 500).chars().count() <= 500);
    }

    #[test]
    fn truncate_leaves_whitespace_untouched() {
        assert_eq!(truncate("  padded text ", 20), "  padded text ");
        assert_eq!(truncate("hello  world", 10), "hello …");
    }

    #[tokio::test]
    async fn movie_payload_targets_request_owner() {
        let lookup = Arc::new(StaticLookup {
            metadata: matrix(),
            calls: AtomicUsize::new(0),
        });
        let event = TransitionEvent::MovieAvailable {
            media: Arc::new(MediaSnapshot::new(1, "603", MediaKind::Movie)),
            variant: Variant::FourK,
        };
        let req = request(9, 1, true, RequestStatus::Approved, &[]);

        let payload = composer(lookup).compose(&event, &req).await.unwrap().unwrap();

        assert_eq!(payload.category, NotificationCategory::MovieAvailable);
        assert_eq!(payload.event, "4K Movie Request Now Available");
        assert_eq!(payload.subject, "The Matrix (1999)");
        assert_eq!(payload.request_id, 9);
        assert_eq!(payload.notify_user, req.requested_by);
        assert!(payload.is4k);
        assert!(payload.extra.is_empty());
    }

    #[tokio::test]
    async fn series_payload_lists_requested_seasons_and_fetches_once() {
        let lookup = Arc::new(StaticLookup {
            metadata: MediaMetadata {
                title: "Game of Thrones".to_string(),
                release_date: Some("2011-04-17".to_string()),
                ..Default::default()
            },
            calls: AtomicUsize::new(0),
        });
        let event = TransitionEvent::SeasonsAvailable {
            media: Arc::new(MediaSnapshot::new(2, "1399", MediaKind::Series)),
            variant: Variant::Standard,
            season_numbers: BTreeSet::from([2]),
            available: BTreeSet::from([1, 2]),
        };
        let requests = vec![
            request(1, 2, false, RequestStatus::Approved, &[1, 2]),
            request(2, 2, false, RequestStatus::Approved, &[2]),
        ];

        let payloads = composer(lookup.clone()).compose_all(&event, &requests).await.unwrap();

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0].event, "Series Request Now Available");
        assert_eq!(payloads[0].extra[0].value, "1, 2");
        assert_eq!(payloads[1].extra[0].value, "2");
        assert_ne!(payloads[0].notification_id, payloads[1].notification_id);
    }

    #[tokio::test]
    async fn album_subject_credits_artist() {
        let lookup = Arc::new(StaticLookup {
            metadata: MediaMetadata {
                title: "OK Computer".to_string(),
                artist: Some("Radiohead".to_string()),
                ..Default::default()
            },
            calls: AtomicUsize::new(0),
        });
        let event = TransitionEvent::AlbumAvailable {
            media: Arc::new(MediaSnapshot::new(3, "b1392450-e666-3926-a536-22c65f834433", MediaKind::Album)),
        };
        let req = request(4, 3, false, RequestStatus::Approved, &[]);

        let payload = composer(lookup).compose(&event, &req).await.unwrap().unwrap();

        assert_eq!(payload.subject, "OK Computer by Radiohead");
        assert_eq!(payload.category, NotificationCategory::AlbumAvailable);
    }

    #[tokio::test]
    async fn lookup_failure_is_reported_to_caller() {
        let event = TransitionEvent::MovieAvailable {
            media: Arc::new(MediaSnapshot::new(1, "603", MediaKind::Movie)),
            variant: Variant::Standard,
        };
        let req = request(1, 1, false, RequestStatus::Approved, &[]);

        assert!(composer(Arc::new(FailingLookup)).compose(&event, &req).await.is_err());
    }

    #[test]
    fn auto_approve_has_no_payload() {
        let event = TransitionEvent::AutoApprove {
            media: Arc::new(MediaSnapshot::new(1, "603", MediaKind::Movie)),
            variant: Variant::Standard,
        };
        let req = request(1, 1, false, RequestStatus::Pending, &[]);

        assert!(composer(Arc::new(FailingLookup)).build(&event, &req, &matrix()).is_none());
    }
}
