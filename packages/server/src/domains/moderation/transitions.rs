//! State transitions for moderatable entities.
//!
//! Every approve/reject, from an admin or from automation, funnels through
//! `TransitionEngine::resolve`. The store's compare-and-swap guarantees at
//! most one resolution per entity; the loser of a race is told who won.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::common::EntityId;
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{Actor, Decision, Entity, EntityState};
use crate::domains::moderation::store::EntityStore;

#[derive(Clone)]
pub struct TransitionEngine {
    store: Arc<dyn EntityStore>,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Apply `decision` to a pending entity.
    ///
    /// - `NotFound` if the id is unknown
    /// - `AlreadyResolved` (with the current record) if it is no longer
    ///   pending, whether it was resolved long ago or by a concurrent writer
    ///   between our read and our write
    ///
    /// Never retries.
    pub async fn resolve(
        &self,
        id: EntityId,
        decision: Decision,
        resolved_by: Actor,
    ) -> ModerationResult<Entity> {
        let current = self.store.get(id).await?;

        if !current.state.is_pending() {
            debug!(
                entity_id = %id,
                state = %current.state,
                decision = %decision,
                "Refusing transition on resolved entity"
            );
            return Err(ModerationError::AlreadyResolved(Box::new(current)));
        }

        let target = decision.target_state();
        match self
            .store
            .compare_and_swap_state(id, EntityState::Pending, target, resolved_by.clone())
            .await
        {
            Ok(entity) => {
                info!(
                    entity_id = %id,
                    kind = %entity.kind,
                    state = %entity.state,
                    resolved_by = %resolved_by,
                    "Entity resolved"
                );
                Ok(entity)
            }
            Err(ModerationError::Conflict(_)) => {
                let winner = self.store.get(id).await?;
                warn!(
                    entity_id = %id,
                    attempted = %decision,
                    attempted_by = %resolved_by,
                    state = %winner.state,
                    "Lost resolution race"
                );
                Err(ModerationError::AlreadyResolved(Box::new(winner)))
            }
            Err(e) => Err(e),
        }
    }
}
