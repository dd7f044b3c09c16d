//! Fuzzy deduplication of affiliation strings.
//!
//! Affiliations for one author drift between records ("Dept of Physics" vs
//! "Department of Physics", stray whitespace). A candidate is only recorded
//! when its best similarity against every recorded affiliation is below the
//! uniqueness ratio.

/// Separator between multiple affiliations of one author.
/// Padded with spaces so HTML entities such as `&amp;` survive the split.
pub const AFFILIATION_SEPARATOR: &str = " ; ";

/// Tokens the index uses for "no affiliation".
const AFFILIATION_PLACEHOLDERS: &[&str] = &["", "-"];

/// String similarity scored from 0 (unrelated) to 100 (identical).
pub trait StringSimilarity: Send + Sync {
    fn score(&self, a: &str, b: &str) -> u8;
}

/// Best match of the shorter string against any equal-length window of the longer.
///
/// Substring-tolerant, so "MIT" scores 100 against "MIT; Department of Physics".
#[derive(Debug, Clone, Copy, Default)]
pub struct PartialRatio;

impl StringSimilarity for PartialRatio {
    fn score(&self, a: &str, b: &str) -> u8 {
        partial_ratio(a, b)
    }
}

pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if short_len == long_chars.len() {
        return to_percent(strsim::normalized_levenshtein(short, long));
    }

    let mut best = 0.0_f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let score = strsim::normalized_levenshtein(short, &candidate);
        if score > best {
            best = score;
            if best >= 1.0 {
                break;
            }
        }
    }
    to_percent(best)
}

fn to_percent(similarity: f64) -> u8 {
    (similarity * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Split a raw affiliation field into trimmed, non-placeholder tokens, in order.
pub fn split_affiliations(raw: &str) -> Vec<&str> {
    raw.split(AFFILIATION_SEPARATOR)
        .map(str::trim)
        .filter(|token| !is_placeholder_affiliation(token))
        .collect()
}

/// First listed affiliation, used as the primary affiliation of an article.
pub fn primary_affiliation(raw: &str) -> Option<&str> {
    raw.split(AFFILIATION_SEPARATOR)
        .next()
        .map(str::trim)
        .filter(|token| !is_placeholder_affiliation(token))
}

pub fn is_placeholder_affiliation(token: &str) -> bool {
    AFFILIATION_PLACEHOLDERS.contains(&token)
}

/// True when `candidate` scores below `uniqueness_ratio` against every recorded affiliation.
pub fn is_distinct_affiliation<'a, I>(
    candidate: &str,
    recorded: I,
    similarity: &dyn StringSimilarity,
    uniqueness_ratio: u8,
) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    recorded
        .into_iter()
        .all(|existing| similarity.score(existing, candidate) < uniqueness_ratio)
}
