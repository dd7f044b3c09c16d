//! Search-index clients.

pub mod ads;

use async_trait::async_trait;
use authornet_common::Result;

use crate::models::{SearchPage, SearchSeed};

/// One paginated query against an external scholarly index.
///
/// Implementations do not retry. A failed fetch surfaces as an error the
/// caller decides how to contain.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, seed: &SearchSeed) -> Result<SearchPage>;
}
