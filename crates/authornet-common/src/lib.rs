//! authornet-common — Shared error type and the capped HTTP client used across all Authornet crates.

pub mod error;
pub mod sandbox;

pub use error::{AuthornetError, Result};
pub use sandbox::SandboxClient;
