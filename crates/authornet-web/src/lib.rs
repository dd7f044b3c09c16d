//! authornet-web — HTTP surface for author suggestion runs.
//!   - `POST /api/suggest` streams profile snapshots as Server-Sent Events
//!   - `GET /health` liveness probe

pub mod router;
pub mod handlers;
pub mod state;
pub mod sse;
