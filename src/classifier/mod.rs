//! Turns a pair of media snapshots into the availability transitions it represents.
//!
//! Classification is a pure diff: no I/O, no clock, no shared state. Calling
//! [`classify`] twice with the same pair yields the same events in the same
//! order, which is what lets the persistence layer retry writes safely.

use crate::models::{MediaKind, MediaSnapshot, MediaStatus, TransitionEvent, Variant};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Classify a write. `old` is `None` on the first observation of a title, in
/// which case every status is treated as [`MediaStatus::Unknown`].
///
/// Events are ordered by variant (standard first), then by rule.
pub fn classify(old: Option<&MediaSnapshot>, new: &MediaSnapshot) -> Vec<TransitionEvent> {
    let media = Arc::new(new.clone());
    let mut events = Vec::new();

    for variant in Variant::ALL {
        // Albums are only acquired through the standard pipeline.
        if new.kind == MediaKind::Album && variant.is_4k() {
            continue;
        }

        let before = old.map(|o| o.status(variant)).unwrap_or_default();
        let after = new.status(variant);

        match new.kind {
            MediaKind::Movie => {
                if after.is_available() && !before.is_available() {
                    events.push(TransitionEvent::MovieAvailable {
                        media: Arc::clone(&media),
                        variant,
                    });
                }
            }
            MediaKind::Album => {
                if after.is_available() && !before.is_available() {
                    events.push(TransitionEvent::AlbumAvailable {
                        media: Arc::clone(&media),
                    });
                }
            }
            MediaKind::Series => {
                if let Some(event) = seasons_available(old, &media, variant) {
                    events.push(event);
                }
                if let Some(event) = new_episodes(old, &media, variant) {
                    events.push(event);
                }
            }
        }

        if before == MediaStatus::Pending && after.is_available() {
            events.push(TransitionEvent::AutoApprove {
                media: Arc::clone(&media),
                variant,
            });
        }
    }

    events
}

fn seasons_available(
    old: Option<&MediaSnapshot>,
    new: &Arc<MediaSnapshot>,
    variant: Variant,
) -> Option<TransitionEvent> {
    if !new.status(variant).has_content() {
        return None;
    }

    let available = new.seasons_with_status(variant, MediaStatus::Available);

    // Match seasons by number, never by position in the list.
    let previous: BTreeMap<u32, MediaStatus> = old
        .map(|o| {
            o.seasons
                .iter()
                .map(|s| (s.season_number, s.status(variant)))
                .collect()
        })
        .unwrap_or_default();

    let changed: BTreeSet<u32> = available
        .iter()
        .copied()
        .filter(|n| !previous.get(n).is_some_and(|s| s.is_available()))
        .collect();

    if changed.is_empty() {
        return None;
    }

    Some(TransitionEvent::SeasonsAvailable {
        media: Arc::clone(new),
        variant,
        season_numbers: changed,
        available,
    })
}

fn new_episodes(
    old: Option<&MediaSnapshot>,
    new: &Arc<MediaSnapshot>,
    variant: Variant,
) -> Option<TransitionEvent> {
    let before = old.and_then(|o| o.last_season_change)?;
    let after = new.last_season_change?;
    if after <= before {
        return None;
    }

    let partial = new.seasons_with_status(variant, MediaStatus::PartiallyAvailable);
    if partial.is_empty() {
        return None;
    }

    Some(TransitionEvent::NewEpisodes {
        media: Arc::clone(new),
        variant,
        season_numbers: partial,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeasonSnapshot;
    use chrono::{TimeZone, Utc};

    use MediaStatus::*;

    fn movie(status: MediaStatus, status4k: MediaStatus) -> MediaSnapshot {
        let mut media = MediaSnapshot::new(10, "603", MediaKind::Movie);
        media.status = status;
        media.status4k = status4k;
        media
    }

    fn series(status: MediaStatus, seasons: &[(u32, MediaStatus)]) -> MediaSnapshot {
        let mut media = MediaSnapshot::new(20, "1399", MediaKind::Series);
        media.status = status;
        media.seasons = seasons
            .iter()
            .map(|(n, s)| SeasonSnapshot::new(*n, *s, Unknown))
            .collect();
        media
    }

    fn names(events: &[TransitionEvent]) -> Vec<(&'static str, Variant)> {
        events.iter().map(|e| (e.name(), e.variant())).collect()
    }

    #[test]
    fn processing_to_available_movie_fires_once_for_standard() {
        let old = movie(Processing, Processing);
        let new = movie(Available, Processing);

        let events = classify(Some(&old), &new);

        assert_eq!(names(&events), vec![("movie_available", Variant::Standard)]);
    }

    #[test]
    fn movie_variants_are_independent() {
        let old = movie(Available, Processing);
        let new = movie(Available, Available);

        let events = classify(Some(&old), &new);

        assert_eq!(names(&events), vec![("movie_available", Variant::FourK)]);
    }

    #[test]
    fn already_available_movie_is_silent() {
        let snapshot = movie(Available, Available);
        assert!(classify(Some(&snapshot), &snapshot).is_empty());
    }

    #[test]
    fn pending_to_available_also_auto_approves() {
        let old = movie(Pending, Unknown);
        let new = movie(Available, Unknown);

        let events = classify(Some(&old), &new);

        assert_eq!(
            names(&events),
            vec![
                ("movie_available", Variant::Standard),
                ("auto_approve", Variant::Standard),
            ]
        );
    }

    #[test]
    fn first_observation_counts_as_transition_from_unknown() {
        let new = movie(Available, Unknown);

        let events = classify(None, &new);

        assert_eq!(names(&events), vec![("movie_available", Variant::Standard)]);
    }

    #[test]
    fn newly_available_season_is_reported_alone() {
        let old = series(PartiallyAvailable, &[(1, Available), (2, Pending)]);
        let new = series(Available, &[(1, Available), (2, Available)]);

        let events = classify(Some(&old), &new);

        assert_eq!(events.len(), 1);
        match &events[0] {
            TransitionEvent::SeasonsAvailable {
                variant,
                season_numbers,
                available,
                ..
            } => {
                assert_eq!(*variant, Variant::Standard);
                assert_eq!(season_numbers, &BTreeSet::from([2]));
                assert_eq!(available, &BTreeSet::from([1, 2]));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn seasons_are_matched_by_number_not_position() {
        let old = series(PartiallyAvailable, &[(2, Pending), (1, Available)]);
        let new = series(PartiallyAvailable, &[(1, Available), (2, Pending)]);

        assert!(classify(Some(&old), &new).is_empty());
    }

    #[test]
    fn series_without_content_is_not_eligible() {
        let old = series(Processing, &[(1, Processing)]);
        let new = series(Processing, &[(1, Available)]);

        assert!(classify(Some(&old), &new).is_empty());
    }

    #[test]
    fn new_episodes_require_a_newer_season_change() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();

        let mut old = series(PartiallyAvailable, &[(1, Available), (3, PartiallyAvailable)]);
        old.last_season_change = Some(t0);
        let mut new = old.clone();
        new.last_season_change = Some(t1);

        let events = classify(Some(&old), &new);
        assert_eq!(names(&events), vec![("new_episodes", Variant::Standard)]);
        match &events[0] {
            TransitionEvent::NewEpisodes { season_numbers, .. } => {
                assert_eq!(season_numbers, &BTreeSet::from([3]));
            }
            other => panic!("unexpected event {other:?}"),
        }

        // Same timestamp: nothing to report.
        assert!(classify(Some(&new), &new).is_empty());

        // Missing old timestamp: rule does not apply.
        old.last_season_change = None;
        assert!(classify(Some(&old), &new).is_empty());
    }

    #[test]
    fn new_episodes_and_new_seasons_can_fire_together() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 3, 8, 30, 0).unwrap();

        let mut old = series(PartiallyAvailable, &[(1, Processing), (2, PartiallyAvailable)]);
        old.last_season_change = Some(t0);
        let mut new = series(PartiallyAvailable, &[(1, Available), (2, PartiallyAvailable)]);
        new.last_season_change = Some(t1);

        let events = classify(Some(&old), &new);

        assert_eq!(
            names(&events),
            vec![
                ("seasons_available", Variant::Standard),
                ("new_episodes", Variant::Standard),
            ]
        );
    }

    #[test]
    fn four_k_series_uses_four_k_season_statuses() {
        let mut old = MediaSnapshot::new(30, "1396", MediaKind::Series);
        old.status4k = PartiallyAvailable;
        old.seasons = vec![
            SeasonSnapshot::new(1, Available, Available),
            SeasonSnapshot::new(2, Available, Processing),
        ];
        let mut new = old.clone();
        new.status4k = Available;
        new.seasons[1].status4k = Available;

        let events = classify(Some(&old), &new);

        assert_eq!(names(&events), vec![("seasons_available", Variant::FourK)]);
    }

    #[test]
    fn album_only_tracks_the_standard_pipeline() {
        let mut old = MediaSnapshot::new(40, "f5093c06-23e3-404f-aeaa-40f72885ee3a", MediaKind::Album);
        old.status = Pending;
        old.status4k = Pending;
        let mut new = old.clone();
        new.status = Available;
        new.status4k = Available;

        let events = classify(Some(&old), &new);

        assert_eq!(
            names(&events),
            vec![
                ("album_available", Variant::Standard),
                ("auto_approve", Variant::Standard),
            ]
        );
    }

    #[test]
    fn blacklisted_or_deleted_never_produces_events() {
        let old = movie(Pending, Pending);
        let new = movie(Blacklisted, Deleted);

        assert!(classify(Some(&old), &new).is_empty());
    }

    #[test]
    fn classification_is_deterministic() {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut old = series(Pending, &[(1, Pending), (2, PartiallyAvailable)]);
        old.last_season_change = Some(t0);
        let mut new = series(Available, &[(1, Available), (2, PartiallyAvailable)]);
        new.last_season_change = Some(t0 + chrono::Duration::hours(1));

        let first = classify(Some(&old), &new);
        let second = classify(Some(&old), &new);

        assert_eq!(first, second);
        assert_eq!(
            names(&first),
            vec![
                ("seasons_available", Variant::Standard),
                ("new_episodes", Variant::Standard),
                ("auto_approve", Variant::Standard),
            ]
        );
    }
}
