use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

const USER_AGENT: &str = concat!("availarr/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    #[instrument(skip(self), fields(url = %redact(url)))]
    pub async fn get(&self, url: &str) -> Result<Response> {
        debug!("Making GET request");
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            error!("HTTP request failed with status: {}", response.status());
            return Err(anyhow::anyhow!("HTTP request failed: {}", response.status()));
        }

        Ok(response)
    }

    #[instrument(skip(self), fields(url = %redact(url)))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;
        let json = response.json::<T>().await?;
        Ok(json)
    }

    /// POST a JSON body, ignoring whatever the server answers with on success.
    #[instrument(skip(self, body, authorization), fields(url = %redact(url)))]
    pub async fn post_json<B: Serialize>(
        &self,
        url: &str,
        body: &B,
        authorization: Option<&str>,
    ) -> Result<()> {
        debug!("Making POST request");
        let mut request = self.client.post(url).json(body);
        if let Some(value) = authorization {
            request = request.header(reqwest::header::AUTHORIZATION, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            error!("HTTP POST failed with status: {}", response.status());
            return Err(anyhow::anyhow!("HTTP POST failed: {}", response.status()));
        }

        Ok(())
    }
}

/// Strip the query string so API keys never reach the logs.
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn redact_drops_query_string() {
        assert_eq!(
            redact("https://api.themoviedb.org/3/movie/603?api_key=secret"),
            "https://api.themoviedb.org/3/movie/603"
        );
        assert_eq!(redact("https://example.com/hook"), "https://example.com/hook");
    }
}
