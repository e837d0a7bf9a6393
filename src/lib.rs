// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod config;
pub mod display;
pub mod history;
pub mod ingest;
pub mod metrics;
pub mod query;
pub mod quote;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::TrackerConfig;
pub use crate::history::{HistoryStore, InMemoryHistory, JsonlHistory};
pub use crate::ingest::{poll_quotes, run_once, SourcePoll, TickReport};
pub use crate::quote::{CanonicalQuote, CanonicalQuoteSet, PriceSnapshotRecord, Product, Source};
