use crate::config::MusicBrainzConfig;
use crate::http::HttpClient;
use crate::metadata::{LookupError, MediaMetadata};
use crate::models::MediaKind;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const ARTIST_PAGE_BASE_URL: &str = "https://musicbrainz.org/artist";
const COVER_ART_BASE_URL: &str = "https://coverartarchive.org/release-group";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

pub struct MusicBrainzClient {
    http: HttpClient,
    config: MusicBrainzConfig,
}

#[derive(Debug, Deserialize)]
struct ReleaseGroup {
    title: String,
    #[serde(rename = "first-release-date")]
    first_release_date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: String,
    #[serde(default)]
    joinphrase: String,
    artist: Option<CreditedArtist>,
}

#[derive(Debug, Deserialize)]
struct CreditedArtist {
    id: String,
}

#[derive(Debug, Deserialize)]
struct WikipediaExtractResponse {
    #[serde(rename = "wikipediaExtract")]
    wikipedia_extract: Option<WikipediaExtract>,
}

#[derive(Debug, Deserialize)]
struct WikipediaExtract {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct CoverArtResponse {
    #[serde(default)]
    images: Vec<CoverArtImage>,
}

#[derive(Debug, Deserialize)]
struct CoverArtImage {
    #[serde(default)]
    thumbnails: CoverArtThumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct CoverArtThumbnails {
    #[serde(rename = "250")]
    small: Option<String>,
}

impl MusicBrainzClient {
    pub fn new(http: HttpClient, config: MusicBrainzConfig) -> Self {
        Self { http, config }
    }

    /// Release-group title and artist are required. The artist's Wikipedia
    /// extract and the cover thumbnail are optional extras: either failing
    /// leaves its field empty rather than failing the lookup.
    #[instrument(skip(self))]
    pub async fn fetch(&self, catalog_id: &str, kind: MediaKind) -> Result<MediaMetadata, LookupError> {
        if kind != MediaKind::Album {
            return Err(LookupError::Unsupported(kind));
        }
        let mbid = Uuid::parse_str(catalog_id.trim()).map_err(|_| LookupError::InvalidCatalogId {
            id: catalog_id.to_string(),
            kind,
        })?;

        let url = format!(
            "{}/release-group/{}?inc=artist-credits&fmt=json",
            self.config.base_url().trim_end_matches('/'),
            mbid
        );
        let group: ReleaseGroup = self.http.get_json(&url).await?;
        let artist = artist_name(&group.artist_credit);
        info!("Fetched album metadata: {} by {}", group.title, artist.as_deref().unwrap_or("unknown artist"));

        let synopsis = match primary_artist_id(&group.artist_credit) {
            Some(artist_id) => self.artist_extract(artist_id).await,
            None => String::new(),
        };
        let artwork_url = self.cover_art(mbid).await;

        Ok(MediaMetadata {
            title: group.title,
            release_date: group.first_release_date,
            synopsis,
            artwork_url,
            artist,
        })
    }

    async fn artist_extract(&self, artist_id: Uuid) -> String {
        let url = format!("{ARTIST_PAGE_BASE_URL}/{artist_id}/wikipedia-extract");
        match self.http.get_json::<WikipediaExtractResponse>(&url).await {
            Ok(response) => extract_text(response),
            Err(e) => {
                warn!(%artist_id, "Failed to fetch artist Wikipedia extract: {}", e);
                String::new()
            }
        }
    }

    async fn cover_art(&self, mbid: Uuid) -> Option<String> {
        let url = format!("{COVER_ART_BASE_URL}/{mbid}");
        match self.http.get_json::<CoverArtResponse>(&url).await {
            Ok(response) => front_thumbnail(response),
            Err(e) => {
                // The archive answers 404 for release groups without art.
                warn!(%mbid, "No cover art available: {}", e);
                None
            }
        }
    }
}

fn artist_name(credits: &[ArtistCredit]) -> Option<String> {
    if credits.is_empty() {
        return None;
    }
    Some(
        credits
            .iter()
            .map(|c| format!("{}{}", c.name, c.joinphrase))
            .collect::<String>(),
    )
}

fn primary_artist_id(credits: &[ArtistCredit]) -> Option<Uuid> {
    let artist = credits.first()?.artist.as_ref()?;
    Uuid::parse_str(&artist.id).ok()
}

/// Plain text of the extract with markup removed.
fn extract_text(response: WikipediaExtractResponse) -> String {
    response
        .wikipedia_extract
        .map(|extract| HTML_TAG.replace_all(&extract.content, "").trim().to_string())
        .unwrap_or_default()
}

fn front_thumbnail(response: CoverArtResponse) -> Option<String> {
    response
        .images
        .into_iter()
        .next()
        .and_then(|image| image.thumbnails.small)
        .filter(|url| !url.is_empty())
}
