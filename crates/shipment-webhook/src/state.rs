use crate::notify::Notifier;
use crate::store::ShipmentStore;
use std::sync::Arc;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ShipmentStore,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    pub fn new(store: ShipmentStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }
}
