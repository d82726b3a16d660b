//! Server dependencies shared by every moderation action
//!
//! Storage sits behind the `EntityStore`/`FlagStore` traits so the same
//! wiring runs against Postgres in production and the in-memory store in
//! tests.

use std::sync::Arc;

use chrono::Duration;

use crate::domains::moderation::automation::{AutomationController, AutomationPolicy};
use crate::domains::moderation::store::{EntityStore, FlagStore, MemoryStore};
use crate::domains::moderation::suspicious::SuspiciousRegistry;
use crate::domains::moderation::transitions::TransitionEngine;

// =============================================================================
// ServerDeps
// =============================================================================

#[derive(Clone)]
pub struct ServerDeps {
    pub store: Arc<dyn EntityStore>,
    pub transitions: TransitionEngine,
    pub suspicious: SuspiciousRegistry,
    pub automation: Arc<AutomationController>,
}

impl ServerDeps {
    pub fn new(
        store: Arc<dyn EntityStore>,
        flags: Arc<dyn FlagStore>,
        policy: AutomationPolicy,
        mode_change_ttl: Duration,
    ) -> Self {
        let transitions = TransitionEngine::new(store.clone());
        let suspicious = SuspiciousRegistry::new(store.clone());
        let automation = Arc::new(AutomationController::new(
            flags,
            store.clone(),
            transitions.clone(),
            policy,
            mode_change_ttl,
        ));

        Self {
            store,
            transitions,
            suspicious,
            automation,
        }
    }

    /// Everything wired to a fresh `MemoryStore` with the standard policy.
    pub fn in_memory(mode_change_ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            store.clone(),
            store,
            AutomationPolicy::standard(),
            mode_change_ttl,
        )
    }
}
