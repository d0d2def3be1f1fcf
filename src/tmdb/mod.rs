use crate::config::TmdbConfig;
use crate::http::HttpClient;
use crate::metadata::{LookupError, MediaMetadata};
use crate::models::MediaKind;
use serde::Deserialize;
use tracing::{info, instrument};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
const POSTER_BASE_URL: &str = "https://image.tmdb.org/t/p/w600_and_h900_bestv2";

pub struct TmdbClient {
    http: HttpClient,
    config: TmdbConfig,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    title: String,
    overview: Option<String>,
    release_date: Option<String>,
    poster_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbTvShow {
    name: String,
    overview: Option<String>,
    first_air_date: Option<String>,
    poster_path: Option<String>,
}

impl TmdbClient {
    pub fn new(http: HttpClient, config: TmdbConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api_key={}",
            self.config.base_url().trim_end_matches('/'),
            path,
            urlencoding::encode(&self.config.api_key)
        )
    }

    #[instrument(skip(self))]
    pub async fn fetch(&self, catalog_id: &str, kind: MediaKind) -> Result<MediaMetadata, LookupError> {
        let tmdb_id: u64 = catalog_id
            .trim()
            .parse()
            .map_err(|_| LookupError::InvalidCatalogId {
                id: catalog_id.to_string(),
                kind,
            })?;

        match kind {
            MediaKind::Movie => {
                let movie: TmdbMovie = self.http.get_json(&self.url(&format!("movie/{tmdb_id}"))).await?;
                info!("Fetched movie metadata: {}", movie.title);
                Ok(MediaMetadata {
                    title: movie.title,
                    release_date: movie.release_date,
                    synopsis: movie.overview.unwrap_or_default(),
                    artwork_url: poster_url(movie.poster_path),
                    artist: None,
                })
            }
            MediaKind::Series => {
                let tv: TmdbTvShow = self.http.get_json(&self.url(&format!("tv/{tmdb_id}"))).await?;
                info!("Fetched series metadata: {}", tv.name);
                Ok(MediaMetadata {
                    title: tv.name,
                    release_date: tv.first_air_date,
                    synopsis: tv.overview.unwrap_or_default(),
                    artwork_url: poster_url(tv.poster_path),
                    artist: None,
                })
            }
            MediaKind::Album => Err(LookupError::Unsupported(kind)),
        }
    }
}

fn poster_url(poster_path: Option<String>) -> Option<String> {
    poster_path
        .filter(|p| !p.is_empty())
        .map(|p| format!("{POSTER_BASE_URL}{p}"))
}
