//! Incremental collation of articles into per-author profiles.
//!
//! Every `(article, author position)` pair is merged into the profile for the
//! author's [`NameKey`] and the updated profile is emitted immediately, so
//! callers can stream partial results while the frontier is still searching.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_stream::stream;
use authornet_common::{AuthornetError, Result};
use chrono::NaiveDate;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::dedup::{
    is_distinct_affiliation, primary_affiliation, split_affiliations, PartialRatio, StringSimilarity,
};
use crate::gender::{Gender, GenderDetector};
use crate::models::ArticleRecord;
use crate::names::{parse_author_name, NameKey};

pub const DEFAULT_AFFILIATION_UNIQUENESS_RATIO: u8 = 75;

/// Tokens the index uses for "no ORCID".
const ORCID_PLACEHOLDERS: &[&str] = &["", "-", "."];

/// Running summary of everything known about one author.
///
/// Sets serialize as sorted sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorProfile {
    pub unique_name_descriptor: NameKey,
    /// Longest matched name; ties keep the one seen first.
    pub full_name: String,
    pub orcid: Option<String>,
    pub most_recent_primary_affiliation: Option<String>,
    pub most_recent_pubdate: Option<NaiveDate>,
    pub bibcodes: Vec<String>,
    pub affiliations: BTreeSet<String>,
    pub matched_names: BTreeSet<String>,
    pub number_of_articles_as_first_author: u32,
    pub number_of_articles: u32,
    pub article_years: Vec<i32>,
    pub inferred_gender: Gender,
}

/// Collaborators and thresholds applied by [`AuthorProfile::merge_article`].
pub struct MergeRules<'a> {
    pub similarity: &'a dyn StringSimilarity,
    pub gender: &'a dyn GenderDetector,
    pub affiliation_uniqueness_ratio: u8,
}

impl AuthorProfile {
    pub fn new(key: NameKey) -> Self {
        Self {
            unique_name_descriptor: key,
            full_name: String::new(),
            orcid: None,
            most_recent_primary_affiliation: None,
            most_recent_pubdate: None,
            bibcodes: Vec::new(),
            affiliations: BTreeSet::new(),
            matched_names: BTreeSet::new(),
            number_of_articles_as_first_author: 0,
            number_of_articles: 0,
            article_years: Vec::new(),
            inferred_gender: Gender::Unknown,
        }
    }

    /// Fold the author at `position` of `article` into this profile.
    ///
    /// An ORCID that differs from the one already recorded is rejected before
    /// anything is changed.
    pub fn merge_article(
        &mut self,
        article: &ArticleRecord,
        position: usize,
        rules: &MergeRules<'_>,
    ) -> Result<()> {
        let author = article.authors.get(position).map(String::as_str).unwrap_or_default();
        let orcid = article.orcid_at(position).filter(|o| !is_placeholder_orcid(o));
        if let (Some(recorded), Some(incoming)) = (self.orcid.as_deref(), orcid) {
            if recorded != incoming {
                return Err(AuthornetError::OrcidConflict {
                    name_key: self.unique_name_descriptor.to_string(),
                    author: author.to_string(),
                    recorded: recorded.to_string(),
                    conflicting: incoming.to_string(),
                });
            }
        }

        self.bibcodes.push(article.bibcode.clone());
        if let Some(year) = article.year {
            self.article_years.push(year);
        }

        if self.record_name(author) && self.inferred_gender == Gender::Unknown {
            let parsed = parse_author_name(&self.full_name);
            if let Some(first_name) = parsed.inferable_first_name() {
                self.inferred_gender = rules.gender.guess(first_name);
            }
        }

        let raw_affiliation = article.affiliation_at(position);
        for candidate in split_affiliations(raw_affiliation) {
            if is_distinct_affiliation(
                candidate,
                &self.affiliations,
                rules.similarity,
                rules.affiliation_uniqueness_ratio,
            ) {
                self.affiliations.insert(candidate.to_string());
            }
        }

        self.number_of_articles += 1;
        if position == 0 {
            self.number_of_articles_as_first_author += 1;
        }

        if let Some(pubdate) = article.pubdate.as_deref().and_then(parse_pubdate) {
            if self.most_recent_pubdate.map_or(true, |current| pubdate > current) {
                self.most_recent_pubdate = Some(pubdate);
                self.most_recent_primary_affiliation =
                    primary_affiliation(raw_affiliation).map(str::to_string);
            }
        }

        if let Some(orcid) = orcid {
            self.orcid = Some(orcid.to_string());
        }
        Ok(())
    }

    /// Add a raw name; returns true when it becomes the new full name.
    fn record_name(&mut self, raw: &str) -> bool {
        let is_new = self.matched_names.insert(raw.to_string());
        let longer = raw.chars().count() > self.full_name.chars().count();
        let first_sighting = is_new && self.matched_names.len() == 1;
        if first_sighting || (is_new && longer) {
            self.full_name = raw.to_string();
            return true;
        }
        false
    }
}

pub fn is_placeholder_orcid(orcid: &str) -> bool {
    ORCID_PLACEHOLDERS.contains(&orcid.trim())
}

/// Parse an index pubdate ("2019-03-00"); a `00` month or day reads as `01`.
pub fn parse_pubdate(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.trim().splitn(3, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(d) => d.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month.max(1), day.max(1))
}

// ── Collator ──────────────────────────────────────────────────────────────────

/// Owns the profile map for one run and is its only writer.
pub struct Collator {
    profiles: HashMap<NameKey, AuthorProfile>,
    similarity: Arc<dyn StringSimilarity>,
    gender: Arc<dyn GenderDetector>,
    affiliation_uniqueness_ratio: u8,
}

impl Collator {
    pub fn new(gender: Arc<dyn GenderDetector>, affiliation_uniqueness_ratio: u8) -> Self {
        Self {
            profiles: HashMap::new(),
            similarity: Arc::new(PartialRatio),
            gender,
            affiliation_uniqueness_ratio,
        }
    }

    pub fn with_similarity(mut self, similarity: Arc<dyn StringSimilarity>) -> Self {
        self.similarity = similarity;
        self
    }

    /// Merge one author position of `article` and return the updated profile.
    pub fn fold_author(&mut self, article: &ArticleRecord, position: usize) -> Result<&AuthorProfile> {
        let raw = article.authors.get(position).map(String::as_str).unwrap_or_default();
        let key = NameKey::from_raw(raw);
        let rules = MergeRules {
            similarity: self.similarity.as_ref(),
            gender: self.gender.as_ref(),
            affiliation_uniqueness_ratio: self.affiliation_uniqueness_ratio,
        };
        let profile = self
            .profiles
            .entry(key.clone())
            .or_insert_with(|| AuthorProfile::new(key));
        profile.merge_article(article, position, &rules)?;
        Ok(profile)
    }

    /// Merge every author of `article`, returning snapshots in author order.
    pub fn fold_article(&mut self, article: &ArticleRecord) -> Result<Vec<AuthorProfile>> {
        (0..article.authors.len())
            .map(|position| self.fold_author(article, position).cloned())
            .collect()
    }

    pub fn profile(&self, key: &NameKey) -> Option<&AuthorProfile> {
        self.profiles.get(key)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Stream a profile snapshot per `(article, author)` pair. An ORCID
    /// conflict is yielded as the final item.
    pub fn fold<S>(mut self, articles: S) -> impl Stream<Item = Result<AuthorProfile>> + Send + 'static
    where
        S: Stream<Item = ArticleRecord> + Send + 'static,
    {
        stream! {
            let mut articles = Box::pin(articles);
            while let Some(article) = articles.next().await {
                for position in 0..article.authors.len() {
                    let snapshot = match self.fold_author(&article, position) {
                        Ok(profile) => profile.clone(),
                        Err(e) => {
                            error!(bibcode = %article.bibcode, error = %e, "Collation aborted");
                            yield Err(e);
                            return;
                        }
                    };
                    yield Ok(snapshot);
                }
            }
            info!(profiles = self.profiles.len(), "Collation finished");
        }
    }
}
