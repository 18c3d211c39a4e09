use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::Store;

/// Shared per-process state. The store is constructed once at startup and
/// injected here; nothing reaches for a global.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        Self::from_parts(
            Arc::new(crate::store::MemStore::new()),
            AppConfig::for_tests(),
        )
    }
}
