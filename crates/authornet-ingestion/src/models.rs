//! Data models shared by the frontier and the collator.

use serde::{Deserialize, Deserializer, Serialize};

/// Fields requested from the upstream index unless the caller overrides them.
pub const DEFAULT_FIELDS: &[&str] = &["id", "author", "bibcode", "year", "aff", "orcid", "pubdate"];

/// Fields without which a returned doc cannot be decoded or collated.
pub const REQUIRED_FIELDS: &[&str] = &["bibcode", "author"];

/// One bibliographic record as returned by the search index.
///
/// `affiliations` and `orcids` are positionally aligned with `authors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    pub bibcode: String,
    #[serde(default, rename = "author")]
    pub authors: Vec<String>,
    #[serde(default, rename = "aff")]
    pub affiliations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub pubdate: Option<String>,
    #[serde(default, rename = "orcid")]
    pub orcids: Vec<String>,
}

impl ArticleRecord {
    /// Affiliation string for the author at `index`; absent entries read as the "-" placeholder.
    pub fn affiliation_at(&self, index: usize) -> &str {
        self.affiliations.get(index).map(String::as_str).unwrap_or("-")
    }

    /// ORCID for the author at `index`, with surrounding whitespace removed.
    pub fn orcid_at(&self, index: usize) -> Option<&str> {
        self.orcids.get(index).map(|o| o.trim())
    }
}

/// What a single fetch task is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedKind {
    Page,
    Similarity,
}

/// Parameters of one page fetch against the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSeed {
    pub kind: SeedKind,
    pub q: String,
    pub fl: String,
    pub start: usize,
    pub rows: usize,
    pub sort: Option<String>,
}

impl SearchSeed {
    pub fn page(q: impl Into<String>, fl: impl Into<String>, start: usize, rows: usize) -> Self {
        Self {
            kind: SeedKind::Page,
            q: q.into(),
            fl: fl.into(),
            start,
            rows,
            sort: None,
        }
    }

    /// `similar(bibcode)` query, best matches first.
    pub fn similar_to(bibcode: &str, fl: impl Into<String>, rows: usize) -> Self {
        Self {
            kind: SeedKind::Similarity,
            q: format!("similar({bibcode})"),
            fl: fl.into(),
            start: 0,
            rows,
            sort: Some("score desc".to_string()),
        }
    }

    /// Query-string pairs in the order the upstream expects them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("q", self.q.clone()),
            ("fl", self.fl.clone()),
            ("start", self.start.to_string()),
            ("rows", self.rows.to_string()),
        ];
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

/// One page of results plus the total match count for the query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(rename = "numFound", default)]
    pub num_found: usize,
    #[serde(default)]
    pub docs: Vec<ArticleRecord>,
}

// ── Lenient field decoding ───────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(i64),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
        StringOrNumber::Str(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
    }))
}

fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::Str(s)) => s.trim().parse().ok(),
        Some(StringOrNumber::Int(n)) => i32::try_from(n).ok(),
        None => None,
    })
}
