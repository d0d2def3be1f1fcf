//! Read-only metadata used to decorate notifications.

use crate::models::MediaKind;
use crate::musicbrainz::MusicBrainzClient;
use crate::tmdb::TmdbClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    /// Release or first-air date, `YYYY-MM-DD` or a prefix of it.
    pub release_date: Option<String>,
    pub synopsis: String,
    pub artwork_url: Option<String>,
    /// Credited artist, albums only.
    pub artist: Option<String>,
}

impl MediaMetadata {
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .and_then(|d| d.get(..4))
            .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("no metadata provider configured for {0}")]
    Unsupported(MediaKind),

    #[error("invalid catalog id {id:?} for {kind}")]
    InvalidCatalogId { id: String, kind: MediaKind },

    #[error(transparent)]
    Http(#[from] anyhow::Error),
}

#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn fetch(&self, catalog_id: &str, kind: MediaKind) -> Result<MediaMetadata, LookupError>;
}

/// Routes lookups to TMDB (movies, series) or MusicBrainz (albums).
pub struct MetadataRouter {
    tmdb: Option<TmdbClient>,
    musicbrainz: Option<MusicBrainzClient>,
}

impl MetadataRouter {
    pub fn new(tmdb: Option<TmdbClient>, musicbrainz: Option<MusicBrainzClient>) -> Self {
        Self { tmdb, musicbrainz }
    }
}

#[async_trait]
impl MetadataLookup for MetadataRouter {
    async fn fetch(&self, catalog_id: &str, kind: MediaKind) -> Result<MediaMetadata, LookupError> {
        match kind {
            MediaKind::Movie | MediaKind::Series => match &self.tmdb {
                Some(client) => client.fetch(catalog_id, kind).await,
                None => Err(LookupError::Unsupported(kind)),
            },
            MediaKind::Album => match &self.musicbrainz {
                Some(client) => client.fetch(catalog_id, kind).await,
                None => Err(LookupError::Unsupported(kind)),
            },
        }
    }
}
