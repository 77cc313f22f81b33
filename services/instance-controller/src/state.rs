//! Application state shared across request handlers.

use std::sync::Arc;

use ic_events::Emitter;

use crate::store::ResourceStore;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn ResourceStore>,
    emitter: Arc<Emitter>,
}

impl AppState {
    pub fn new(store: Arc<dyn ResourceStore>, emitter: Arc<Emitter>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { store, emitter }),
        }
    }

    pub fn store(&self) -> &dyn ResourceStore {
        self.inner.store.as_ref()
    }

    /// Emitter for events raised by the API itself (state changes).
    pub fn emitter(&self) -> &Emitter {
        &self.inner.emitter
    }
}
