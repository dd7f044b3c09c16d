//! End-to-end suggestion run: frontier articles folded into author profiles.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use authornet_common::Result;
use futures::{Stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use crate::collator::{AuthorProfile, Collator};
use crate::frontier::Frontier;
use crate::gender::GenderDetector;
use crate::names::NameKey;
use crate::request::SuggestPlan;
use crate::sources::SearchIndex;

/// Stream profile snapshots for every author reachable from the plan's names.
///
/// Nothing is fetched until the stream is first polled. The stream ends after
/// the first error it yields.
pub fn suggest_authors(
    index: Arc<dyn SearchIndex>,
    plan: SuggestPlan,
    gender: Arc<dyn GenderDetector>,
) -> impl Stream<Item = Result<AuthorProfile>> + Send + 'static {
    let SuggestPlan { author_names, frontier, affiliation_uniqueness_ratio } = plan;

    stream! {
        let run_id = Uuid::new_v4();
        info!(%run_id, names = ?author_names, "Suggestion run started");

        let articles = Frontier::new(index, frontier).run(author_names);
        let mut profiles = Box::pin(Collator::new(gender, affiliation_uniqueness_ratio).fold(articles));

        let mut snapshots = 0usize;
        while let Some(item) = profiles.next().await {
            match item {
                Ok(profile) => {
                    snapshots += 1;
                    yield Ok(profile);
                }
                Err(e) => {
                    warn!(%run_id, snapshots, error = %e, "Suggestion run stopped");
                    yield Err(e);
                    return;
                }
            }
        }

        info!(%run_id, snapshots, "Suggestion run finished");
    }
}

/// Keep the latest snapshot per author and rank by article count.
///
/// Ties are broken by name key so the order is stable across runs.
pub fn top_authors<I>(snapshots: I, n: usize) -> Vec<AuthorProfile>
where
    I: IntoIterator<Item = AuthorProfile>,
{
    let mut latest: HashMap<NameKey, AuthorProfile> = HashMap::new();
    for profile in snapshots {
        latest.insert(profile.unique_name_descriptor.clone(), profile);
    }

    let mut ranked: Vec<AuthorProfile> = latest.into_values().collect();
    ranked.sort_by(|a, b| {
        b.number_of_articles
            .cmp(&a.number_of_articles)
            .then_with(|| a.unique_name_descriptor.cmp(&b.unique_name_descriptor))
    });
    ranked.truncate(n);
    ranked
}

/// Drain a suggestion stream and rank the result; the first error wins.
pub async fn collect_top_authors<S>(profiles: S, n: usize) -> Result<Vec<AuthorProfile>>
where
    S: Stream<Item = Result<AuthorProfile>>,
{
    let mut profiles = Box::pin(profiles);
    let mut snapshots = Vec::new();
    while let Some(item) = profiles.next().await {
        snapshots.push(item?);
    }
    Ok(top_authors(snapshots, n))
}
