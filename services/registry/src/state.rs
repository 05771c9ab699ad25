//! Application state shared across request handlers.

use std::sync::Arc;

use crate::allocation::IdentifierAllocator;

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    allocator: IdentifierAllocator,
}

impl AppState {
    /// Create a new application state.
    pub fn new(allocator: IdentifierAllocator) -> Self {
        Self {
            inner: Arc::new(AppStateInner { allocator }),
        }
    }

    /// Get a reference to the identifier allocator.
    pub fn allocator(&self) -> &IdentifierAllocator {
        &self.inner.allocator
    }
}
