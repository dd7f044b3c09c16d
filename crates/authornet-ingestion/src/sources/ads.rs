//! NASA/ADS search API client.
//!
//! Endpoint: https://api.adsabs.harvard.edu/v1/search/query
//! Auth:     `Authorization: Bearer <token>`
//! Response: `{ "response": { "numFound": N, "docs": [...] } }`

use std::time::Duration;

use async_trait::async_trait;
use authornet_common::{AuthornetError, Result, SandboxClient};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::models::{SearchPage, SearchSeed};
use super::SearchIndex;

pub const ADS_SEARCH_URL: &str = "https://api.adsabs.harvard.edu/v1/search/query";

#[derive(Debug, Deserialize)]
struct AdsEnvelope {
    response: SearchPage,
}

pub struct AdsClient {
    client: SandboxClient,
    base_url: String,
}

impl AdsClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = SandboxClient::new(timeout)?.with_bearer_token(token);
        Self::with_client(client, base_url)
    }

    /// Wrap an already configured client; the base URL must pass its allowlist.
    pub fn with_client(client: SandboxClient, base_url: &str) -> Result<Self> {
        if !client.is_allowed(base_url) {
            return Err(AuthornetError::Config(format!(
                "search endpoint {base_url} is not an allowed host"
            )));
        }
        Ok(Self { client, base_url: base_url.to_string() })
    }
}

#[async_trait]
impl SearchIndex for AdsClient {
    #[instrument(skip(self, seed), fields(q = %seed.q, start = seed.start, rows = seed.rows))]
    async fn search(&self, seed: &SearchSeed) -> Result<SearchPage> {
        debug!("Searching ADS");
        let resp = self.client
            .get(&self.base_url)?
            .query(&seed.query_pairs())
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(AuthornetError::UpstreamStatus {
                status: status.as_u16(),
                query: seed.q.clone(),
            });
        }

        let body = resp.text().await?;
        let page = parse_search_response(&body)?;
        debug!(num_found = page.num_found, docs = page.docs.len(), "ADS search returned");
        Ok(page)
    }
}

/// Decode the `response` envelope of a search reply.
pub fn parse_search_response(body: &str) -> Result<SearchPage> {
    let envelope: AdsEnvelope = serde_json::from_str(body)?;
    Ok(envelope.response)
}
