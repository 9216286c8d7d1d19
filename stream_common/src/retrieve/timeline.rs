//! # Home Timeline Client
//!
//! An `EventFeed` over the v1.1 `statuses/home_timeline.json` endpoint,
//! authenticated with OAuth 1.0a user credentials.
//!
//! Each status in the response decodes straight into an `Event`; fields the
//! pipeline does not carry are ignored.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use url::Url;

use super::{oauth1, EventFeed, FetchError};
use crate::configs::Credentials;
use crate::core::event::Event;

/// The production home timeline endpoint.
pub const DEFAULT_URL: &str = "https://api.twitter.com/1.1/statuses/home_timeline.json";

/// A signed client for the home timeline.
pub struct HomeTimeline {
    /// The shared HTTP client.
    client: reqwest::Client,
    /// Absolute endpoint URL, without a query string.
    endpoint: Url,
    credentials: Credentials,
}

impl HomeTimeline {
    /// A client for the production endpoint.
    pub fn new(credentials: Credentials) -> Result<Self, FetchError> {
        Self::with_endpoint(credentials, DEFAULT_URL)
    }

    /// A client for a custom endpoint (a proxy, or a local test server).
    pub fn with_endpoint(credentials: Credentials, endpoint: &str) -> Result<Self, FetchError> {
        let endpoint = Url::parse(endpoint).map_err(|e| FetchError::Url(e.to_string()))?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            credentials,
        })
    }

    /// The endpoint this client polls.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Query parameters for one poll. `since_id` is left out while it is `0`.
fn query_params(count: usize, since_id: i64) -> Vec<(&'static str, String)> {
    let mut params = vec![("count", count.to_string())];
    if since_id > 0 {
        params.push(("since_id", since_id.to_string()));
    }
    params
}

#[async_trait]
impl EventFeed for HomeTimeline {
    async fn fetch_events(&self, count: usize, since_id: i64) -> Result<Vec<Event>, FetchError> {
        // 1. Build the query
        let params = query_params(count, since_id);
        let signed: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();

        // 2. Sign it
        let authorization = oauth1::authorization_header(
            "GET",
            self.endpoint.as_str(),
            &signed,
            &self.credentials,
            &oauth1::nonce(),
            oauth1::timestamp(),
        )?;

        // 3. Execute the request
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&params)
            .header(AUTHORIZATION, authorization)
            .send()
            .await?;

        // 4. Reject non-success statuses with their body
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // 5. Decode the statuses
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(FetchError::Decode)
    }
}
