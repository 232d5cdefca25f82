// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bounded-time HTTP layer.
//!
//! [`HttpFetcher`] performs one JSON GET under a hard time budget. When the
//! budget expires the in-flight request future is dropped, which aborts the
//! underlying connection rather than leaving it running in the background.
//!
//! [`FlightFeed`] builds on it for the aircraft feed and substitutes the
//! bundled snapshot whenever the live call fails, so callers always receive
//! records in the same shape.

mod feed;
#[cfg(test)]
pub(crate) mod test_server;

pub use feed::{FlightFeed, FlightSource, FALLBACK_SNAPSHOT};

use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::model::BoundingBox;

/// Default time budget for a single request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2000);

/// Default aircraft feed server.
pub const DEFAULT_FEED_URL: &str = "http://localhost:8000";

const USER_AGENT: &str = concat!("skywatch/", env!("CARGO_PKG_VERSION"));

/// Errors produced by a bounded HTTP fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("bundled snapshot is invalid: {0}")]
    Snapshot(#[source] serde_json::Error),
}

/// Configuration for the aircraft feed.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Feed server base URL, without the `/api/flights/` suffix.
    pub base_url: String,
    /// Optional geographic restriction sent as `bbox`.
    pub bbox: Option<BoundingBox>,
    /// Hard time budget per request.
    pub timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_FEED_URL.to_string(),
            bbox: Some(BoundingBox::default()),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// JSON GET with a hard deadline.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Build a fetcher with its own connection pool.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self::with_client(Self::build_client(timeout)?, timeout))
    }

    /// Build a client suitable for sharing between fetchers.
    pub fn build_client(connect_timeout: Duration) -> Result<reqwest::Client, FetchError> {
        Ok(reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .build()?)
    }

    /// Wrap an existing client. The deadline is enforced independently of the
    /// client's own timeout settings.
    #[must_use]
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` with `query` parameters and decode the body as JSON.
    ///
    /// Non-2xx statuses, transport failures, deadline expiry and undecodable
    /// bodies are all reported as errors.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let request = self.client.get(url).query(query);

        let body = tokio::time::timeout(self.timeout, async {
            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status));
            }
            Ok(response.bytes().await?)
        })
        .await
        .map_err(|_elapsed| FetchError::Timeout(self.timeout))??;

        debug!("GET {} returned {} bytes", url, body.len());
        Ok(serde_json::from_slice(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::test_server::{self, Reply};
    use crate::model::FeedResponse;

    #[tokio::test]
    async fn test_get_json_success() {
        let base = test_server::spawn(Reply::json(r#"{"flights":[{"icao24":"abc123"}]}"#)).await;
        let fetcher = test_server::fetcher(Duration::from_secs(2));

        let resp: FeedResponse = fetcher.get_json(&base, &[]).await.unwrap();
        assert_eq!(resp.flights.len(), 1);
        assert_eq!(resp.flights[0].icao24, "abc123");
    }

    #[tokio::test]
    async fn test_get_json_http_error() {
        let base = test_server::spawn(Reply::status(503)).await;
        let fetcher = test_server::fetcher(Duration::from_secs(2));

        let err = fetcher.get_json::<FeedResponse>(&base, &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(s) if s.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_get_json_malformed() {
        let base = test_server::spawn(Reply::json("<html>nope</html>")).await;
        let fetcher = test_server::fetcher(Duration::from_secs(2));

        let err = fetcher.get_json::<FeedResponse>(&base, &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_get_json_times_out() {
        let base = test_server::spawn(Reply::Hang).await;
        let fetcher = test_server::fetcher(Duration::from_millis(100));

        let started = std::time::Instant::now();
        let err = fetcher.get_json::<FeedResponse>(&base, &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
