//! Debounced, cancellable lookups.
//!
//! A [`DebouncedSearch`] serves one search context (one lookup field).
//! Each call takes a new generation and a fresh [`CancellationToken`] and
//! cancels the token of the call before it, so only the last keystroke
//! within the debounce window reaches the backend. A result is applied only
//! if its generation is still the latest when it arrives.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::error::DeskError;
use crate::remote::{SearchBackend, SearchHit, SearchKind};

/// What became of one search call.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Latest results for the query.
    Results(Vec<SearchHit>),
    /// Query too short; results cleared and in-flight work cancelled.
    Cleared,
    /// A newer call replaced this one.
    Superseded,
}

/// One search context with at most one request in flight.
#[derive(Debug)]
pub struct DebouncedSearch {
    kind: SearchKind,
    backend: Arc<dyn SearchBackend>,
    debounce: Duration,
    min_chars: usize,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
    latest: RwLock<Vec<SearchHit>>,
}

impl DebouncedSearch {
    /// Creates a context searching `kind`.
    #[must_use]
    pub fn new(
        kind: SearchKind,
        backend: Arc<dyn SearchBackend>,
        debounce: Duration,
        min_chars: usize,
    ) -> Self {
        Self {
            kind,
            backend,
            debounce,
            min_chars,
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
            latest: RwLock::new(Vec::new()),
        }
    }

    /// Results of the last applied search.
    pub async fn latest(&self) -> Vec<SearchHit> {
        self.latest.read().await.clone()
    }

    /// Runs `query` after the debounce window unless a newer call arrives
    /// first. Queries shorter than the minimum clear the results.
    ///
    /// # Errors
    ///
    /// Returns the backend error of a request that was still current.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, DeskError> {
        let query = query.trim();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        let long_enough = query.chars().count() >= self.min_chars;

        let token = CancellationToken::new();
        let previous = {
            let mut slot = self.in_flight.lock().await;
            let previous = slot.take();
            if long_enough {
                *slot = Some(token.clone());
            }
            previous
        };
        if let Some(previous) = previous {
            previous.cancel();
        }

        if !long_enough {
            self.latest.write().await.clear();
            tracing::debug!(kind = %self.kind, generation, "search cleared");
            return Ok(SearchOutcome::Cleared);
        }

        tokio::select! {
            () = token.cancelled() => return Ok(SearchOutcome::Superseded),
            () = tokio::time::sleep(self.debounce) => {}
        }

        tracing::debug!(kind = %self.kind, generation, query, "search dispatched");
        let result = tokio::select! {
            () = token.cancelled() => return Ok(SearchOutcome::Superseded),
            result = self.backend.search(self.kind, query) => result,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(kind = %self.kind, generation, "discarding stale search result");
            return Ok(SearchOutcome::Superseded);
        }
        let hits = result?;
        *self.latest.write().await = hits.clone();
        Ok(SearchOutcome::Results(hits))
    }
}

/// Upper bound on registered search contexts.
pub const MAX_SEARCH_CONTEXTS: usize = 64;

/// Search contexts keyed by a caller-chosen name and the entity kind, so
/// that separate lookup fields never cancel each other.
///
/// At most [`MAX_SEARCH_CONTEXTS`] are kept. When full, contexts with no
/// caller holding them are evicted; if every one is busy the new context
/// is served unregistered.
#[derive(Debug)]
pub struct SearchRegistry {
    contexts: RwLock<HashMap<(String, SearchKind), Arc<DebouncedSearch>>>,
    backend: Arc<dyn SearchBackend>,
    debounce: Duration,
    min_chars: usize,
}

impl SearchRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>, debounce: Duration, min_chars: usize) -> Self {
        Self {
            contexts: RwLock::new(HashMap::new()),
            backend,
            debounce,
            min_chars,
        }
    }

    /// Returns the context `(name, kind)`, creating it if needed.
    pub async fn context(&self, name: &str, kind: SearchKind) -> Arc<DebouncedSearch> {
        let key = (name.to_string(), kind);
        if let Some(ctx) = self.contexts.read().await.get(&key) {
            return Arc::clone(ctx);
        }
        let mut contexts = self.contexts.write().await;
        if let Some(ctx) = contexts.get(&key) {
            return Arc::clone(ctx);
        }
        if contexts.len() >= MAX_SEARCH_CONTEXTS {
            contexts.retain(|_, ctx| Arc::strong_count(ctx) > 1);
            tracing::debug!(remaining = contexts.len(), "evicted idle search contexts");
        }
        let ctx = Arc::new(DebouncedSearch::new(
            kind,
            Arc::clone(&self.backend),
            self.debounce,
            self.min_chars,
        ));
        if contexts.len() < MAX_SEARCH_CONTEXTS {
            let _ = contexts.insert(key, Arc::clone(&ctx));
        } else {
            tracing::warn!(context = name, "search context limit reached, serving unregistered");
        }
        ctx
    }

    /// Number of registered contexts.
    pub async fn len(&self) -> usize {
        self.contexts.read().await.len()
    }

    /// Returns `true` if no context is registered.
    pub async fn is_empty(&self) -> bool {
        self.contexts.read().await.is_empty()
    }
}
