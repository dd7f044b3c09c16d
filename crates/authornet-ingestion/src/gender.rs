//! Gender-expression inference from a first name.
//!
//! The detector is loaded once and shared read-only by every collation run.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

/// `Andy` means the name is equally likely either way; `Unknown` means it was not found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    #[default]
    Unknown,
    Andy,
    Male,
    Female,
    MostlyMale,
    MostlyFemale,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Unknown      => "unknown",
            Gender::Andy         => "andy",
            Gender::Male         => "male",
            Gender::Female       => "female",
            Gender::MostlyMale   => "mostly_male",
            Gender::MostlyFemale => "mostly_female",
        }
    }
}

pub trait GenderDetector: Send + Sync {
    fn guess(&self, first_name: &str) -> Gender;
}

/// Case-insensitive first-name lookup table.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    names: HashMap<String, Gender>,
}

impl NameTable {
    /// A table that answers `Unknown` for every name.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Gender)>,
        S: AsRef<str>,
    {
        let names = entries
            .into_iter()
            .map(|(name, gender)| (name.as_ref().to_lowercase(), gender))
            .collect();
        Self { names }
    }

    /// Parse a JSON object of `{ "first_name": "category" }`.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, Gender> = serde_json::from_str(json)?;
        Ok(Self::from_entries(raw))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading gender table {}", path.display()))?;
        let table = Self::from_json(&content)
            .with_context(|| format!("parsing gender table {}", path.display()))?;
        info!(names = table.len(), path = %path.display(), "Gender table loaded");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl GenderDetector for NameTable {
    fn guess(&self, first_name: &str) -> Gender {
        self.names
            .get(&first_name.trim().to_lowercase())
            .copied()
            .unwrap_or_default()
    }
}
