use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Season number 0 holds specials and never gates series completeness.
pub const SPECIALS_SEASON: u32 = 0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(alias = "tv")]
    Series,
    #[serde(alias = "music")]
    Album,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => f.write_str("movie"),
            MediaKind::Series => f.write_str("series"),
            MediaKind::Album => f.write_str("album"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaStatus {
    #[default]
    Unknown,
    Pending,
    Processing,
    PartiallyAvailable,
    Available,
    Blacklisted,
    Deleted,
}

impl MediaStatus {
    pub fn is_available(self) -> bool {
        self == MediaStatus::Available
    }

    /// Available or partially available.
    pub fn has_content(self) -> bool {
        matches!(self, MediaStatus::Available | MediaStatus::PartiallyAvailable)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Declined,
    Failed,
    Completed,
    DeletionPending,
    DeletionApproved,
    DeletionDeclined,
}

/// Which acquisition pipeline a status or request belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Standard,
    #[serde(rename = "4k")]
    FourK,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Standard, Variant::FourK];

    pub fn from_is4k(is4k: bool) -> Self {
        if is4k {
            Variant::FourK
        } else {
            Variant::Standard
        }
    }

    pub fn is_4k(self) -> bool {
        self == Variant::FourK
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Standard => f.write_str("standard"),
            Variant::FourK => f.write_str("4k"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeasonSnapshot {
    #[serde(rename = "seasonNumber")]
    pub season_number: u32,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default)]
    pub status4k: MediaStatus,
}

impl SeasonSnapshot {
    pub fn new(season_number: u32, status: MediaStatus, status4k: MediaStatus) -> Self {
        Self {
            season_number,
            status,
            status4k,
        }
    }

    pub fn status(&self, variant: Variant) -> MediaStatus {
        match variant {
            Variant::Standard => self.status,
            Variant::FourK => self.status4k,
        }
    }
}

/// Availability state of one title at a single point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaSnapshot {
    pub id: i64,
    /// TMDB id for movies and series, MusicBrainz release-group id for albums.
    #[serde(rename = "catalogId")]
    pub catalog_id: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub status: MediaStatus,
    #[serde(default)]
    pub status4k: MediaStatus,
    #[serde(default)]
    pub seasons: Vec<SeasonSnapshot>,
    #[serde(default, rename = "lastSeasonChange")]
    pub last_season_change: Option<DateTime<Utc>>,
}

impl MediaSnapshot {
    pub fn new(id: i64, catalog_id: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id,
            catalog_id: catalog_id.into(),
            kind,
            status: MediaStatus::Unknown,
            status4k: MediaStatus::Unknown,
            seasons: Vec::new(),
            last_season_change: None,
        }
    }

    pub fn status(&self, variant: Variant) -> MediaStatus {
        match variant {
            Variant::Standard => self.status,
            Variant::FourK => self.status4k,
        }
    }

    /// Season numbers whose status in `variant` equals `status`.
    pub fn seasons_with_status(&self, variant: Variant, status: MediaStatus) -> BTreeSet<u32> {
        self.seasons
            .iter()
            .filter(|s| s.status(variant) == status)
            .map(|s| s.season_number)
            .collect()
    }

    /// Every regular (non-special) season number known for this title.
    pub fn regular_seasons(&self) -> BTreeSet<u32> {
        self.seasons
            .iter()
            .map(|s| s.season_number)
            .filter(|n| *n != SPECIALS_SEASON)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestOwner {
    pub id: i64,
    #[serde(rename = "displayName")]
    pub display_name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaRequest {
    pub id: i64,
    #[serde(rename = "mediaId")]
    pub media_id: i64,
    #[serde(default)]
    pub is4k: bool,
    pub status: RequestStatus,
    #[serde(rename = "requestedBy")]
    pub requested_by: RequestOwner,
    /// Requested season numbers; empty means every season of the series.
    #[serde(default)]
    pub seasons: BTreeSet<u32>,
}

impl MediaRequest {
    pub fn variant(&self) -> Variant {
        Variant::from_is4k(self.is4k)
    }

    /// Requested seasons with the implicit "all seasons" form expanded against `media`.
    pub fn wanted_seasons(&self, media: &MediaSnapshot) -> BTreeSet<u32> {
        if self.seasons.is_empty() {
            media.regular_seasons()
        } else {
            self.seasons.clone()
        }
    }
}

/// A meaningful availability change derived from one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEvent {
    MovieAvailable {
        media: Arc<MediaSnapshot>,
        variant: Variant,
    },
    AlbumAvailable {
        media: Arc<MediaSnapshot>,
    },
    SeasonsAvailable {
        media: Arc<MediaSnapshot>,
        variant: Variant,
        /// Seasons that crossed into availability on this write.
        season_numbers: BTreeSet<u32>,
        /// Every season available after the write.
        available: BTreeSet<u32>,
    },
    NewEpisodes {
        media: Arc<MediaSnapshot>,
        variant: Variant,
        season_numbers: BTreeSet<u32>,
    },
    AutoApprove {
        media: Arc<MediaSnapshot>,
        variant: Variant,
    },
}

impl TransitionEvent {
    pub fn media(&self) -> &MediaSnapshot {
        match self {
            TransitionEvent::MovieAvailable { media, .. }
            | TransitionEvent::AlbumAvailable { media }
            | TransitionEvent::SeasonsAvailable { media, .. }
            | TransitionEvent::NewEpisodes { media, .. }
            | TransitionEvent::AutoApprove { media, .. } => media,
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            TransitionEvent::AlbumAvailable { .. } => Variant::Standard,
            TransitionEvent::MovieAvailable { variant, .. }
            | TransitionEvent::SeasonsAvailable { variant, .. }
            | TransitionEvent::NewEpisodes { variant, .. }
            | TransitionEvent::AutoApprove { variant, .. } => *variant,
        }
    }

    /// Short machine name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            TransitionEvent::MovieAvailable { .. } => "movie_available",
            TransitionEvent::AlbumAvailable { .. } => "album_available",
            TransitionEvent::SeasonsAvailable { .. } => "seasons_available",
            TransitionEvent::NewEpisodes { .. } => "new_episodes",
            TransitionEvent::AutoApprove { .. } => "auto_approve",
        }
    }
}

impl fmt::Display for TransitionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (media {}, {})",
            self.name(),
            self.media().id,
            self.variant()
        )
    }
}

/// Category of a user-facing notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationCategory {
    MovieAvailable,
    SeriesAvailable,
    NewEpisode,
    AlbumAvailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtraField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationPayload {
    #[serde(rename = "notificationId")]
    pub notification_id: uuid::Uuid,
    pub category: NotificationCategory,
    /// Human label, e.g. "4K Movie Request Now Available".
    pub event: String,
    #[serde(rename = "mediaId")]
    pub media_id: i64,
    #[serde(rename = "requestId")]
    pub request_id: i64,
    pub is4k: bool,
    #[serde(rename = "notifyUser")]
    pub notify_user: RequestOwner,
    pub subject: String,
    pub message: String,
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<ExtraField>,
}

/// Comma separated season list, e.g. "1, 2, 5".
pub fn format_seasons(seasons: &BTreeSet<u32>) -> String {
    seasons
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_seasons_expand_to_regular_seasons() {
        let mut media = MediaSnapshot::new(1, "1399", MediaKind::Series);
        media.seasons = vec![
            SeasonSnapshot::new(0, MediaStatus::Available, MediaStatus::Unknown),
            SeasonSnapshot::new(1, MediaStatus::Available, MediaStatus::Unknown),
            SeasonSnapshot::new(2, MediaStatus::Pending, MediaStatus::Unknown),
        ];
        let request = MediaRequest {
            id: 7,
            media_id: 1,
            is4k: false,
            status: RequestStatus::Approved,
            requested_by: RequestOwner {
                id: 1,
                display_name: "alice".to_string(),
                email: None,
            },
            seasons: BTreeSet::new(),
        };

        assert_eq!(request.wanted_seasons(&media), BTreeSet::from([1, 2]));
    }

    #[test]
    fn snapshot_deserializes_from_yaml() {
        let yaml = r#"
id: 3
catalogId: "603"
kind: movie
status: PROCESSING
status4k: AVAILABLE
"#;
        let media: MediaSnapshot = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(media.kind, MediaKind::Movie);
        assert_eq!(media.status(Variant::Standard), MediaStatus::Processing);
        assert_eq!(media.status(Variant::FourK), MediaStatus::Available);
        assert!(media.seasons.is_empty());
        assert!(media.last_season_change.is_none());
    }

    #[test]
    fn seasons_render_in_order() {
        assert_eq!(format_seasons(&BTreeSet::from([3, 1, 2])), "1, 2, 3");
    }
}
