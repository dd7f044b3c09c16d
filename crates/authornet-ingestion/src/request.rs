//! Validation and normalization of suggestion requests.
//!
//! Everything is checked here, before the first upstream query. A single
//! name or index where a list is expected is accepted as a one-element list
//! and logged with a warning.

use authornet_common::{AuthornetError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::collator::DEFAULT_AFFILIATION_UNIQUENESS_RATIO;
use crate::frontier::FrontierConfig;
use crate::models::REQUIRED_FIELDS;

/// A list that may have been sent as a bare scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self, field: &str) -> Vec<T> {
        match self {
            OneOrMany::One(value) => {
                warn!(field, "Expected a list; treating the single value as a one-element list");
                vec![value]
            }
            OneOrMany::Many(values) => values,
        }
    }
}

/// Request body for an author-suggestion run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub author_names: OneOrMany<String>,
    #[serde(default)]
    pub similarity_search_on_author_indices: Option<OneOrMany<isize>>,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub similarity_rows: Option<usize>,
    #[serde(default)]
    pub max_initial_rows: Option<usize>,
    #[serde(default)]
    pub affiliation_uniqueness_ratio: Option<u32>,
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

/// Settings applied when a request leaves them out.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestDefaults {
    pub frontier: FrontierConfig,
    pub affiliation_uniqueness_ratio: u8,
}

impl Default for SuggestDefaults {
    fn default() -> Self {
        Self {
            frontier: FrontierConfig::default(),
            affiliation_uniqueness_ratio: DEFAULT_AFFILIATION_UNIQUENESS_RATIO,
        }
    }
}

/// A validated run description.
#[derive(Debug, Clone, PartialEq)]
pub struct SuggestPlan {
    pub author_names: Vec<String>,
    pub frontier: FrontierConfig,
    pub affiliation_uniqueness_ratio: u8,
}

impl SuggestRequest {
    pub fn for_names(author_names: Vec<String>) -> Self {
        Self {
            author_names: OneOrMany::Many(author_names),
            similarity_search_on_author_indices: None,
            rows: None,
            similarity_rows: None,
            max_initial_rows: None,
            affiliation_uniqueness_ratio: None,
            fields: None,
        }
    }

    /// Decode a JSON body; shape errors are reported as invalid input.
    pub fn from_json(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| AuthornetError::InvalidInput(format!("malformed suggestion request: {e}")))
    }

    pub fn normalize(self, defaults: &SuggestDefaults) -> Result<SuggestPlan> {
        let author_names: Vec<String> = self
            .author_names
            .into_vec("author_names")
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect();
        validate_author_names(&author_names)?;

        let mut frontier = defaults.frontier.clone();
        if let Some(indices) = self.similarity_search_on_author_indices {
            frontier.similarity_search_on_author_indices =
                Some(indices.into_vec("similarity_search_on_author_indices"));
        }
        if let Some(rows) = self.rows {
            frontier.rows = rows;
        }
        if let Some(rows) = self.similarity_rows {
            frontier.similarity_rows = rows;
        }
        if let Some(max) = self.max_initial_rows {
            frontier.max_initial_rows = max;
        }
        if let Some(fields) = self.fields {
            frontier.fields = fields;
        }

        if frontier.rows == 0 {
            return Err(AuthornetError::InvalidInput("rows must be at least 1".into()));
        }
        if frontier.similarity_rows == 0 {
            return Err(AuthornetError::InvalidInput("similarity_rows must be at least 1".into()));
        }
        if frontier.fields.iter().all(|f| f.trim().is_empty()) {
            return Err(AuthornetError::InvalidInput("fields must name at least one field".into()));
        }
        if let Some(missing) = REQUIRED_FIELDS
            .iter()
            .find(|required| !frontier.fields.iter().any(|f| f.trim() == **required))
        {
            return Err(AuthornetError::InvalidInput(format!(
                "fields must include {missing:?}"
            )));
        }

        let affiliation_uniqueness_ratio = match self.affiliation_uniqueness_ratio {
            None => defaults.affiliation_uniqueness_ratio,
            Some(ratio) if ratio <= 100 => ratio as u8,
            Some(ratio) => {
                return Err(AuthornetError::InvalidInput(format!(
                    "affiliation_uniqueness_ratio must be between 0 and 100, got {ratio}"
                )))
            }
        };

        Ok(SuggestPlan {
            author_names,
            frontier,
            affiliation_uniqueness_ratio,
        })
    }
}

/// Names end up inside `author:"..."` clauses, so they may not contain quotes.
pub fn validate_author_names(author_names: &[String]) -> Result<()> {
    if author_names.is_empty() {
        return Err(AuthornetError::InvalidInput("at least one author name is required".into()));
    }
    for name in author_names {
        if name.trim().is_empty() {
            return Err(AuthornetError::InvalidInput("author names may not be blank".into()));
        }
        if name.contains('"') {
            return Err(AuthornetError::InvalidInput(format!(
                "author name {name:?} contains a double quote"
            )));
        }
    }
    Ok(())
}
