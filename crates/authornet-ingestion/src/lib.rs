//! authornet-ingestion — Author discovery and collation over the ADS search index.
//! - Author-name parsing and the "Lastname, F." join key
//! - Paginated search client for the upstream index
//! - Expanding search frontier (pages + similarity searches)
//! - Incremental collation of articles into author profiles
//! - Fuzzy affiliation deduplication and gender inference collaborators

pub mod collator;
pub mod dedup;
pub mod frontier;
pub mod gender;
pub mod models;
pub mod names;
pub mod pipeline;
pub mod request;
pub mod sources;
