//! HTTP handlers for all web routes.

pub mod suggest;
pub mod system;
