//! Configuration loading for authornet.
//! Reads authornet.toml from the current directory or the path in the
//! AUTHORNET_CONFIG env var. Every field has a default.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use authornet_ingestion::frontier::FrontierConfig;
use authornet_ingestion::models::DEFAULT_FIELDS;
use authornet_ingestion::request::SuggestDefaults;
use authornet_ingestion::sources::ads::ADS_SEARCH_URL;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ads: AdsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub collate: CollateConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Falls back to AUTHORNET_ADS_TOKEN, then ADS_API_TOKEN.
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url()     -> String { ADS_SEARCH_URL.to_string() }
fn default_timeout_secs() -> u64    { 30 }

impl Default for AdsConfig {
    fn default() -> Self {
        Self { base_url: default_base_url(), token: None, timeout_secs: default_timeout_secs() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_similarity_rows")]
    pub similarity_rows: usize,
    #[serde(default = "default_max_initial_rows")]
    pub max_initial_rows: usize,
    /// Absent disables similarity search; negative positions count from the end.
    pub similarity_search_on_author_indices: Option<Vec<isize>>,
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_rows()             -> usize { 20 }
fn default_similarity_rows()  -> usize { 5 }
fn default_max_initial_rows() -> usize { 500 }
fn default_max_in_flight()    -> usize { 8 }
fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            similarity_rows: default_similarity_rows(),
            max_initial_rows: default_max_initial_rows(),
            similarity_search_on_author_indices: None,
            fields: default_fields(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollateConfig {
    #[serde(default = "default_uniqueness_ratio")]
    pub affiliation_uniqueness_ratio: u8,
    /// JSON object of `{ "first_name": "category" }`; absent means every guess is `unknown`.
    pub gender_table: Option<String>,
}

fn default_uniqueness_ratio() -> u8 { 75 }

impl Default for CollateConfig {
    fn default() -> Self {
        Self { affiliation_uniqueness_ratio: default_uniqueness_ratio(), gender_table: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String { "127.0.0.1:3000".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}


impl Config {
    /// Load configuration from authornet.toml.
    /// Checks AUTHORNET_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("AUTHORNET_CONFIG")
            .unwrap_or_else(|_| "authornet.toml".to_string());

        if !Path::new(&path).exists() {
            warn!("Config file not found: {path}; using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {path}"))?;
        Self::from_toml_str(&content).with_context(|| format!("parsing {path}"))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.collate.affiliation_uniqueness_ratio > 100 {
            anyhow::bail!(
                "collate.affiliation_uniqueness_ratio must be between 0 and 100, got {}",
                config.collate.affiliation_uniqueness_ratio
            );
        }
        Ok(config)
    }

    pub fn ads_token(&self) -> Option<String> {
        resolve_token(self.ads.token.as_deref(), |key| std::env::var(key).ok())
    }

    pub fn ads_timeout(&self) -> Duration {
        Duration::from_secs(self.ads.timeout_secs)
    }

    /// AUTHORNET_BIND overrides `server.bind`.
    pub fn bind_addr(&self) -> String {
        std::env::var("AUTHORNET_BIND").unwrap_or_else(|_| self.server.bind.clone())
    }

    pub fn suggest_defaults(&self) -> SuggestDefaults {
        SuggestDefaults {
            frontier: FrontierConfig {
                rows: self.search.rows,
                similarity_rows: self.search.similarity_rows,
                max_initial_rows: self.search.max_initial_rows,
                fields: self.search.fields.clone(),
                similarity_search_on_author_indices: self.search.similarity_search_on_author_indices.clone(),
                max_in_flight: self.search.max_in_flight,
            },
            affiliation_uniqueness_ratio: self.collate.affiliation_uniqueness_ratio,
        }
    }
}

fn resolve_token<F>(configured: Option<&str>, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    configured
        .map(str::to_string)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| env("AUTHORNET_ADS_TOKEN").filter(|t| !t.trim().is_empty()))
        .or_else(|| env("ADS_API_TOKEN").filter(|t| !t.trim().is_empty()))
}
