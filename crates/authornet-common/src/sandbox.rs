use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::AuthornetError;

/// Hosts reachable by default: the ADS search API plus loopback for local mirrors.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "api.adsabs.harvard.edu", // NASA/ADS
    "localhost",
    "127.0.0.1",
];

/// An HTTP client that only issues requests to approved hosts and carries the
/// upstream bearer token, if one is configured.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
    bearer_token: Option<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, AuthornetError> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("authornet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthornetError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            allowlist: DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect(),
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: Option<String>) -> Self {
        self.bearer_token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        // Exact match or a subdomain of an allowed host
        self.allowlist
            .iter()
            .any(|allowed| host == allowed || host.ends_with(&format!(".{}", allowed)))
    }

    /// GET builder with the bearer token attached.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, AuthornetError> {
        if !self.is_allowed(url) {
            return Err(AuthornetError::Security(format!(
                "domain not in allowlist for URL {}",
                url
            )));
        }

        let builder = self.client.get(url);
        Ok(match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_allowlist() {
        let client = SandboxClient::new(Duration::from_secs(5)).unwrap();
        assert!(client.is_allowed("https://api.adsabs.harvard.edu/v1/search/query"));
        assert!(client.is_allowed("http://127.0.0.1:8080/v1/search/query"));
        assert!(!client.is_allowed("https://example.com/search"));
        assert!(!client.is_allowed("not a url"));
    }

    #[test]
    fn test_allow_domain_and_subdomains() {
        let mut client = SandboxClient::new(Duration::from_secs(5)).unwrap();
        assert!(!client.is_allowed("https://ads.mirror.org/v1/search/query"));
        client.allow_domain("mirror.org");
        assert!(client.is_allowed("https://ads.mirror.org/v1/search/query"));
        assert!(client.get("https://ads.mirror.org/v1/search/query").is_ok());
    }

    #[test]
    fn test_blocked_get_is_security_error() {
        let client = SandboxClient::new(Duration::from_secs(5)).unwrap();
        let err = client.get("https://example.com/").unwrap_err();
        assert!(matches!(err, AuthornetError::Security(_)));
    }

    #[test]
    fn test_blank_token_is_dropped() {
        let client = SandboxClient::new(Duration::from_secs(5))
            .unwrap()
            .with_bearer_token(Some("  ".into()));
        assert!(client.bearer_token.is_none());
    }
}
