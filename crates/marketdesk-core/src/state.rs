//! Shared agent state
//!
//! One mutable slice visible to both the query orchestrator and the external
//! chat-assistant widget. The orchestrator is the only writer of
//! `market_news` and overwrites it wholesale on every successful fetch; the
//! assistant reads it. `proverbs` belongs to the assistant and is never
//! touched by this core.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::news::NewsRecord;

/// State slice shared with the external assistant component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SharedAgentState {
    #[serde(default)]
    pub proverbs: Vec<String>,
    #[serde(default)]
    pub market_news: Vec<NewsRecord>,
}

/// Handle to the session-wide shared state.
///
/// Passed into the orchestrator's constructor rather than living as an
/// ambient global; the external consumer keeps a clone for reading.
pub type SharedState = Arc<RwLock<SharedAgentState>>;

/// Create an empty shared state for a new session
pub fn shared_state() -> SharedState {
    Arc::new(RwLock::new(SharedAgentState::default()))
}
