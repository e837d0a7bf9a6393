// src/ingest/types.rs
use anyhow::Result;
use std::sync::Arc;

use crate::quote::{CanonicalQuoteSet, Source};

/// A vendor price feed that yields one canonical quote set per poll.
///
/// `Ok(None)` means the vendor answered but the payload was malformed;
/// `Err(_)` means the vendor could not be reached or returned a non-success status.
#[async_trait::async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Option<CanonicalQuoteSet>>;
    fn source(&self) -> Source;
    fn name(&self) -> &'static str {
        self.source().id()
    }
}

/// Providers shared between the scheduler and the HTTP handlers.
pub type SharedProviders = Arc<Vec<Box<dyn QuoteProvider>>>;
