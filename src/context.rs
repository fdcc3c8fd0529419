use crate::config::Config;
use crate::hub::BroadcastHub;
use crate::read_state::ReadStateTracker;
use crate::store::MessageStore;
use std::sync::Arc;

/// Application context containing shared dependencies.
/// This reduces parameter passing and makes it easier to add new dependencies.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn MessageStore>,
    pub hub: Arc<BroadcastHub>,
    pub read_state: ReadStateTracker,
    pub config: Arc<Config>,
}

impl AppContext {
    pub fn new(store: Arc<dyn MessageStore>, hub: Arc<BroadcastHub>, config: Arc<Config>) -> Self {
        let read_state = ReadStateTracker::new(store.clone());
        Self {
            store,
            hub,
            read_state,
            config,
        }
    }
}
