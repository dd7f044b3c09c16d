//! Expanding search frontier.
//!
//! One run turns a set of author names into a lazy stream of articles:
//!   1. Fetch the first page of `author:"A" OR author:"B" ...` and read `numFound`
//!   2. Queue the remaining pages (capped by `max_initial_rows` per name)
//!   3. Emit first-page articles; matching articles queue a `similar(bibcode)` search
//!   4. Drain completed fetches as they land, emitting their articles and queueing
//!      further similarity searches, until nothing is queued or in flight
//!
//! Failed fetches are logged and read as empty pages. Each bibcode triggers at
//! most one similarity search per run. Dropping the stream aborts every
//! in-flight fetch.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use async_stream::stream;
use authornet_common::Result;
use futures::Stream;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::models::{ArticleRecord, SearchPage, SearchSeed, SeedKind, DEFAULT_FIELDS};
use crate::names::NameKey;
use crate::sources::SearchIndex;

// ── Config ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FrontierConfig {
    /// Page size of the initial author query.
    pub rows: usize,
    /// Page size of each `similar(bibcode)` query.
    pub similarity_rows: usize,
    /// Cap on initial-query rows, per author name.
    pub max_initial_rows: usize,
    pub fields: Vec<String>,
    /// Author positions checked for a seed-name match; negative positions count
    /// from the end of the author list. `None` disables similarity search.
    pub similarity_search_on_author_indices: Option<Vec<isize>>,
    /// Upper bound on concurrent fetches.
    pub max_in_flight: usize,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            similarity_rows: 5,
            max_initial_rows: 500,
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
            similarity_search_on_author_indices: None,
            max_in_flight: 8,
        }
    }
}

/// `author:"A" OR author:"B"`. Names must already be free of double quotes.
pub fn combined_author_query(author_names: &[String]) -> String {
    author_names
        .iter()
        .map(|name| format!("author:\"{name}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Start offsets of the pages after the first one.
pub fn remaining_page_starts(num_found: usize, max_rows: usize, rows: usize) -> Vec<usize> {
    let rows = rows.max(1);
    (rows..num_found.min(max_rows)).step_by(rows).collect()
}

// ── Similarity trigger ────────────────────────────────────────────────────────

/// Decides which articles seed a similarity search, once per bibcode.
#[derive(Debug)]
pub struct SimilarityTrigger {
    seed_keys: HashSet<NameKey>,
    author_indices: Vec<isize>,
    searched: HashSet<String>,
}

impl SimilarityTrigger {
    pub fn new(author_names: &[String], author_indices: Option<&[isize]>) -> Self {
        Self {
            seed_keys: author_names.iter().map(|n| NameKey::from_raw(n)).collect(),
            author_indices: author_indices.map(<[isize]>::to_vec).unwrap_or_default(),
            searched: HashSet::new(),
        }
    }

    /// True if a seed name appears at one of the watched author positions.
    pub fn matches(&self, article: &ArticleRecord) -> bool {
        self.author_indices.iter().any(|&index| {
            resolve_author_index(index, article.authors.len())
                .and_then(|position| article.authors.get(position))
                .is_some_and(|author| self.seed_keys.contains(&NameKey::from_raw(author)))
        })
    }

    /// True the first time a matching bibcode is seen; false forever after.
    pub fn claim(&mut self, article: &ArticleRecord) -> bool {
        if self.searched.contains(&article.bibcode) || !self.matches(article) {
            return false;
        }
        self.searched.insert(article.bibcode.clone())
    }

    pub fn searched_count(&self) -> usize {
        self.searched.len()
    }
}

/// `-1` is the last author; out-of-range positions resolve to nothing.
pub fn resolve_author_index(index: isize, len: usize) -> Option<usize> {
    if index >= 0 {
        let position = index.unsigned_abs();
        (position < len).then_some(position)
    } else {
        len.checked_sub(index.unsigned_abs())
    }
}

// ── Run bookkeeping ───────────────────────────────────────────────────────────

#[derive(Debug)]
struct FetchTask {
    id: u64,
    seed: SearchSeed,
}

#[derive(Debug, Default)]
struct FrontierStats {
    pages: usize,
    similarity_searches: usize,
    failures: usize,
    articles: usize,
}

struct FrontierState {
    fl: String,
    similarity_rows: usize,
    pending: VecDeque<FetchTask>,
    trigger: SimilarityTrigger,
    completed: HashSet<u64>,
    next_id: u64,
    stats: FrontierStats,
}

impl FrontierState {
    fn new(config: &FrontierConfig, author_names: &[String]) -> Self {
        Self {
            fl: config.fields.join(","),
            similarity_rows: config.similarity_rows,
            pending: VecDeque::new(),
            trigger: SimilarityTrigger::new(
                author_names,
                config.similarity_search_on_author_indices.as_deref(),
            ),
            completed: HashSet::new(),
            next_id: 0,
            stats: FrontierStats::default(),
        }
    }

    fn task(&mut self, seed: SearchSeed) -> FetchTask {
        let id = self.next_id;
        self.next_id += 1;
        match seed.kind {
            SeedKind::Page => self.stats.pages += 1,
            SeedKind::Similarity => self.stats.similarity_searches += 1,
        }
        FetchTask { id, seed }
    }

    fn enqueue_page(&mut self, q: &str, start: usize, rows: usize) {
        let task = self.task(SearchSeed::page(q, self.fl.clone(), start, rows));
        self.pending.push_back(task);
    }

    /// Queue a similarity search for `article` if it qualifies. Similarity
    /// searches jump the queue so they are not starved by later pages.
    fn expand(&mut self, article: &ArticleRecord) {
        self.stats.articles += 1;
        if !self.trigger.claim(article) {
            return;
        }
        debug!(bibcode = %article.bibcode, "Queueing similarity search");
        let seed = SearchSeed::similar_to(&article.bibcode, self.fl.clone(), self.similarity_rows);
        let task = self.task(seed);
        self.pending.push_front(task);
    }

    /// Record a finished fetch. Failures and duplicate completions yield no page.
    fn settle(&mut self, task: &FetchTask, outcome: Result<SearchPage>) -> Option<SearchPage> {
        let first_completion = self.completed.insert(task.id);
        debug_assert!(first_completion, "fetch task {} completed twice", task.id);
        if !first_completion {
            error!(task = task.id, q = %task.seed.q, "Fetch task completed twice; dropping");
            return None;
        }
        match outcome {
            Ok(page) => {
                debug!(
                    q = %task.seed.q,
                    start = task.seed.start,
                    num_found = page.num_found,
                    docs = page.docs.len(),
                    "Fetch complete"
                );
                Some(page)
            }
            Err(e) => {
                self.stats.failures += 1;
                warn!(q = %task.seed.q, start = task.seed.start, error = %e, "Fetch failed; treating as empty page");
                None
            }
        }
    }

    fn log_summary(&self) {
        info!(
            pages = self.stats.pages,
            similarity_searches = self.stats.similarity_searches,
            failures = self.stats.failures,
            articles = self.stats.articles,
            "Search frontier exhausted"
        );
    }
}

fn spawn_fetch(
    in_flight: &mut JoinSet<(FetchTask, Result<SearchPage>)>,
    index: Arc<dyn SearchIndex>,
    task: FetchTask,
) {
    in_flight.spawn(async move {
        let outcome = index.search(&task.seed).await;
        (task, outcome)
    });
}

// ── Frontier ──────────────────────────────────────────────────────────────────

/// Scheduler for one expanding search. Single-use: [`Frontier::run`] consumes it.
pub struct Frontier {
    index: Arc<dyn SearchIndex>,
    config: FrontierConfig,
}

impl Frontier {
    pub fn new(index: Arc<dyn SearchIndex>, config: FrontierConfig) -> Self {
        Self { index, config }
    }

    /// Stream every article reachable from `author_names`.
    ///
    /// First-page articles come first, in index order. Later pages and
    /// similarity results follow in completion order.
    pub fn run(self, author_names: Vec<String>) -> impl Stream<Item = ArticleRecord> + Send + 'static {
        let Frontier { index, config } = self;
        let rows = config.rows.max(1);
        let max_in_flight = config.max_in_flight.max(1);

        stream! {
            let mut state = FrontierState::new(&config, &author_names);
            let query = combined_author_query(&author_names);

            // The first page is awaited directly: its numFound sizes the run.
            let first = state.task(SearchSeed::page(query.clone(), state.fl.clone(), 0, rows));
            let outcome = index.search(&first.seed).await;
            let Some(first_page) = state.settle(&first, outcome) else {
                state.log_summary();
                return;
            };

            let max_rows = config.max_initial_rows.saturating_mul(author_names.len().max(1));
            for start in remaining_page_starts(first_page.num_found, max_rows, rows) {
                state.enqueue_page(&query, start, rows);
            }

            let mut in_flight = JoinSet::new();
            while in_flight.len() < max_in_flight {
                let Some(task) = state.pending.pop_front() else { break };
                spawn_fetch(&mut in_flight, index.clone(), task);
            }

            for article in first_page.docs {
                state.expand(&article);
                yield article;
            }

            loop {
                while in_flight.len() < max_in_flight {
                    let Some(task) = state.pending.pop_front() else { break };
                    spawn_fetch(&mut in_flight, index.clone(), task);
                }

                // Nothing queued and nothing in flight: fixed point reached.
                let Some(joined) = in_flight.join_next().await else { break };
                let (task, outcome) = match joined {
                    Ok(done) => done,
                    Err(e) => {
                        state.stats.failures += 1;
                        error!(error = %e, "Fetch task aborted");
                        continue;
                    }
                };
                let Some(page) = state.settle(&task, outcome) else { continue };

                for article in page.docs {
                    state.expand(&article);
                    yield article;
                }
            }

            state.log_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use authornet_common::AuthornetError;
    use futures::StreamExt;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn article(bibcode: &str, authors: &[&str]) -> ArticleRecord {
        ArticleRecord {
            id: None,
            bibcode: bibcode.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            affiliations: vec!["-".to_string(); authors.len()],
            year: Some(2020),
            pubdate: Some("2020-01-00".to_string()),
            orcids: vec![],
        }
    }

    /// In-memory index keyed by (q, start). Unknown queries return an empty page.
    #[derive(Default)]
    struct FakeIndex {
        pages: HashMap<(String, usize), SearchPage>,
        failing: HashSet<(String, usize)>,
        requests: Mutex<Vec<SearchSeed>>,
        delay_pages_after_first: Option<Duration>,
    }

    impl FakeIndex {
        fn page(mut self, q: &str, start: usize, num_found: usize, docs: Vec<ArticleRecord>) -> Self {
            self.pages.insert((q.to_string(), start), SearchPage { num_found, docs });
            self
        }

        fn failing(mut self, q: &str, start: usize) -> Self {
            self.failing.insert((q.to_string(), start));
            self
        }

        fn requests(&self) -> Vec<SearchSeed> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchIndex for FakeIndex {
        async fn search(&self, seed: &SearchSeed) -> Result<SearchPage> {
            self.requests.lock().unwrap().push(seed.clone());
            if seed.start > 0 {
                if let Some(delay) = self.delay_pages_after_first {
                    tokio::time::sleep(delay).await;
                }
            }
            let key = (seed.q.clone(), seed.start);
            if self.failing.contains(&key) {
                return Err(AuthornetError::UpstreamStatus { status: 502, query: seed.q.clone() });
            }
            Ok(self.pages.get(&key).cloned().unwrap_or_default())
        }
    }

    const CASEY: &str = "author:\"Casey, A\"";

    fn config_with_similarity(indices: Option<Vec<isize>>) -> FrontierConfig {
        FrontierConfig { similarity_search_on_author_indices: indices, ..FrontierConfig::default() }
    }

    #[test]
    fn test_combined_query() {
        let names = vec!["Casey, A".to_string(), "Hogg, D".to_string()];
        assert_eq!(combined_author_query(&names), "author:\"Casey, A\" OR author:\"Hogg, D\"");
    }

    #[test]
    fn test_remaining_page_starts() {
        assert_eq!(remaining_page_starts(45, 500, 20), vec![20, 40]);
        assert_eq!(remaining_page_starts(20, 500, 20), Vec::<usize>::new());
        assert_eq!(remaining_page_starts(5000, 100, 20), vec![20, 40, 60, 80]);
        assert_eq!(remaining_page_starts(0, 500, 20), Vec::<usize>::new());
    }

    #[test]
    fn test_trigger_claims_each_bibcode_once() {
        let names = vec!["Casey, A".to_string()];
        let mut trigger = SimilarityTrigger::new(&names, Some(&[0]));
        let a = article("2019A", &["Casey, Andrew R.", "Smith, B"]);
        assert!(trigger.claim(&a));
        assert!(!trigger.claim(&a));
        assert!(!trigger.claim(&article("2019B", &["Smith, B", "Casey, A"])));
        assert_eq!(trigger.searched_count(), 1);
    }

    #[test]
    fn test_trigger_disabled_without_indices() {
        let names = vec!["Casey, A".to_string()];
        let mut trigger = SimilarityTrigger::new(&names, None);
        assert!(!trigger.claim(&article("2019A", &["Casey, A"])));
    }

    #[test]
    fn test_trigger_ignores_out_of_range_index() {
        let names = vec!["Casey, A".to_string()];
        let trigger = SimilarityTrigger::new(&names, Some(&[5]));
        assert!(!trigger.matches(&article("2019A", &["Casey, A"])));
        let trigger = SimilarityTrigger::new(&names, Some(&[-2]));
        assert!(!trigger.matches(&article("2019A", &["Casey, A"])));
    }

    #[test]
    fn test_trigger_counts_negative_index_from_end() {
        let names = vec!["Casey, A".to_string()];
        let mut trigger = SimilarityTrigger::new(&names, Some(&[-1]));
        assert!(!trigger.claim(&article("2019A", &["Casey, A", "Smith, B"])));
        assert!(trigger.claim(&article("2019B", &["Smith, B", "Hogg, D", "Casey, Andrew"])));
    }

    #[test]
    fn test_resolve_author_index() {
        assert_eq!(resolve_author_index(0, 3), Some(0));
        assert_eq!(resolve_author_index(2, 3), Some(2));
        assert_eq!(resolve_author_index(3, 3), None);
        assert_eq!(resolve_author_index(-1, 3), Some(2));
        assert_eq!(resolve_author_index(-3, 3), Some(0));
        assert_eq!(resolve_author_index(-4, 3), None);
        assert_eq!(resolve_author_index(-1, 0), None);
    }

    #[tokio::test]
    async fn test_schedules_remaining_pages_after_first() {
        let first: Vec<_> = (0..20).map(|i| article(&format!("P0-{i}"), &["Casey, A"])).collect();
        let second: Vec<_> = (0..20).map(|i| article(&format!("P1-{i}"), &["Casey, A"])).collect();
        let third: Vec<_> = (0..5).map(|i| article(&format!("P2-{i}"), &["Casey, A"])).collect();
        let index = Arc::new(
            FakeIndex::default()
                .page(CASEY, 0, 45, first)
                .page(CASEY, 20, 45, second)
                .page(CASEY, 40, 45, third),
        );

        let frontier = Frontier::new(index.clone(), config_with_similarity(None));
        let articles: Vec<_> = frontier.run(vec!["Casey, A".to_string()]).collect().await;

        assert_eq!(articles.len(), 45);
        assert!(articles[..20].iter().all(|a| a.bibcode.starts_with("P0-")));
        assert_eq!(articles[0].bibcode, "P0-0");
        assert_eq!(articles[19].bibcode, "P0-19");

        let mut starts: Vec<usize> = index.requests().iter().map(|s| s.start).collect();
        starts.sort_unstable();
        assert_eq!(starts, vec![0, 20, 40]);
        assert!(index.requests().iter().all(|s| s.kind == SeedKind::Page && s.rows == 20));
    }

    #[tokio::test]
    async fn test_max_initial_rows_caps_pages() {
        let index = Arc::new(FakeIndex::default().page(CASEY, 0, 10_000, vec![article("P0", &["Casey, A"])]));
        let config = FrontierConfig { max_initial_rows: 60, ..FrontierConfig::default() };
        let _: Vec<_> = Frontier::new(index.clone(), config).run(vec!["Casey, A".to_string()]).collect().await;

        let mut starts: Vec<usize> = index.requests().iter().map(|s| s.start).collect();
        starts.sort_unstable();
        assert_eq!(starts, vec![0, 20, 40]);
    }

    #[tokio::test]
    async fn test_similarity_search_enqueued_once_per_bibcode() {
        let hit = article("2019MNRAS.483.3255C", &["Casey, A", "Smith, B"]);
        let index = Arc::new(
            FakeIndex::default()
                .page(CASEY, 0, 40, vec![hit.clone(), article("2018X", &["Smith, B", "Casey, A"])])
                // Pagination overlap: the same bibcode comes back on the next page.
                .page(CASEY, 20, 40, vec![hit.clone()])
                .page("similar(2019MNRAS.483.3255C)", 0, 1, vec![article("2020SIM", &["Jones, C"])]),
        );

        let frontier = Frontier::new(index.clone(), config_with_similarity(Some(vec![0])));
        let articles: Vec<_> = frontier.run(vec!["Casey, A".to_string()]).collect().await;

        let similarity: Vec<_> = index
            .requests()
            .into_iter()
            .filter(|s| s.kind == SeedKind::Similarity)
            .collect();
        assert_eq!(similarity.len(), 1);
        assert_eq!(similarity[0].q, "similar(2019MNRAS.483.3255C)");
        assert_eq!(similarity[0].rows, 5);
        assert_eq!(similarity[0].sort.as_deref(), Some("score desc"));
        assert!(articles.iter().any(|a| a.bibcode == "2020SIM"));
        assert_eq!(articles.len(), 4);
    }

    #[tokio::test]
    async fn test_similarity_results_expand_transitively() {
        let index = Arc::new(
            FakeIndex::default()
                .page(CASEY, 0, 1, vec![article("A1", &["Casey, A"])])
                .page("similar(A1)", 0, 1, vec![article("A2", &["Casey, Andy"])])
                .page("similar(A2)", 0, 1, vec![article("A1", &["Casey, A"])]),
        );
        let frontier = Frontier::new(index.clone(), config_with_similarity(Some(vec![0])));
        let articles: Vec<_> = frontier.run(vec!["Casey, A".to_string()]).collect().await;

        // A1 -> similar(A1) -> A2 -> similar(A2) -> A1 again, which is not re-expanded.
        let bibcodes: Vec<_> = articles.iter().map(|a| a.bibcode.as_str()).collect();
        assert_eq!(bibcodes, vec!["A1", "A2", "A1"]);
        assert_eq!(index.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_page_is_empty_and_run_continues() {
        let index = Arc::new(
            FakeIndex::default()
                .page(CASEY, 0, 60, vec![article("P0", &["Casey, A"])])
                .failing(CASEY, 20)
                .page(CASEY, 40, 60, vec![article("P2", &["Casey, A"])]),
        );
        let frontier = Frontier::new(index.clone(), config_with_similarity(Some(vec![0])));
        let articles: Vec<_> = frontier.run(vec!["Casey, A".to_string()]).collect().await;

        let bibcodes: HashSet<_> = articles.iter().map(|a| a.bibcode.clone()).collect();
        assert_eq!(bibcodes, HashSet::from(["P0".to_string(), "P2".to_string()]));
    }

    #[tokio::test]
    async fn test_failed_first_page_ends_run() {
        let index = Arc::new(FakeIndex::default().failing(CASEY, 0));
        let frontier = Frontier::new(index.clone(), FrontierConfig::default());
        let articles: Vec<_> = frontier.run(vec!["Casey, A".to_string()]).collect().await;
        assert!(articles.is_empty());
        assert_eq!(index.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_fetches_are_bounded() {
        struct CountingIndex {
            current: AtomicUsize,
            peak: AtomicUsize,
        }

        #[async_trait]
        impl SearchIndex for CountingIndex {
            async fn search(&self, seed: &SearchSeed) -> Result<SearchPage> {
                let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                self.current.fetch_sub(1, Ordering::SeqCst);
                let docs = vec![article(&format!("B{}", seed.start), &["Casey, A"])];
                Ok(SearchPage { num_found: 400, docs })
            }
        }

        let index = Arc::new(CountingIndex { current: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        let config = FrontierConfig { max_in_flight: 3, ..FrontierConfig::default() };
        let articles: Vec<_> = Frontier::new(index.clone(), config).run(vec!["Casey, A".to_string()]).collect().await;

        assert_eq!(articles.len(), 20);
        assert!(index.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_dropping_stream_abandons_fetches() {
        let index = Arc::new(FakeIndex {
            delay_pages_after_first: Some(Duration::from_secs(3600)),
            ..FakeIndex::default().page(CASEY, 0, 100, vec![article("P0", &["Casey, A"])])
        });
        let frontier = Frontier::new(index.clone(), FrontierConfig::default());
        let mut stream = Box::pin(frontier.run(vec!["Casey, A".to_string()]));

        let first = stream.next().await.unwrap();
        assert_eq!(first.bibcode, "P0");
        drop(stream);

        // Aborted fetches release their handle on the index once the runtime reaps them.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(Arc::strong_count(&index), 1);
    }
}
