//! Shared state between handlers.

use ::std::sync::Arc;

use ::sparkpilot_common::store::Store;
use ::sparkpilot_engine::EngineAdapter;

pub(crate) struct AppState<S: Store, E: EngineAdapter> {
    store: Arc<S>,
    engine: Arc<E>,
}

// derive(Clone) would require S: Clone and E: Clone.
impl<S: Store, E: EngineAdapter> Clone for AppState<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<S: Store, E: EngineAdapter> AppState<S, E> {
    pub(crate) fn new(store: S, engine: E) -> Self {
        Self {
            store: Arc::new(store),
            engine: Arc::new(engine),
        }
    }

    pub(crate) fn get_store(&self) -> &S {
        &self.store
    }

    pub(crate) fn get_engine(&self) -> &E {
        &self.engine
    }
}
