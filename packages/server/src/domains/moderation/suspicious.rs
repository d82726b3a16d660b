//! Suspicious-partner registry.
//!
//! Suspicion is a flag on the partner record, so the "suspicious" and
//! "normal" lists are two filters over the same set of active partners and a
//! partner can never show up in both.

use std::sync::Arc;

use tracing::info;

use crate::common::EntityId;
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::Entity;
use crate::domains::moderation::store::EntityStore;

#[derive(Clone)]
pub struct SuspiciousRegistry {
    store: Arc<dyn EntityStore>,
}

impl SuspiciousRegistry {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Flag a partner as suspicious.
    ///
    /// `AlreadySuspicious` (carrying the unchanged partner) if it is already
    /// flagged.
    pub async fn mark_suspicious(&self, partner_id: EntityId) -> ModerationResult<Entity> {
        let partner = self.set_flag(partner_id, true).await?;
        info!(partner_id = %partner_id, "Partner marked suspicious");
        Ok(partner)
    }

    /// Clear the suspicious flag. Mirror of [`Self::mark_suspicious`].
    pub async fn unmark_suspicious(&self, partner_id: EntityId) -> ModerationResult<Entity> {
        let partner = self.set_flag(partner_id, false).await?;
        info!(partner_id = %partner_id, "Partner suspicion removed");
        Ok(partner)
    }

    pub async fn list_suspicious(&self) -> ModerationResult<Vec<Entity>> {
        self.store.list_partners(true).await
    }

    pub async fn list_normal(&self) -> ModerationResult<Vec<Entity>> {
        self.store.list_partners(false).await
    }

    async fn set_flag(&self, partner_id: EntityId, target: bool) -> ModerationResult<Entity> {
        let current = self.store.get(partner_id).await?;
        if current.is_active_partner() && current.suspicion == target {
            return Err(already_there(current, target));
        }

        match self
            .store
            .compare_and_swap_suspicion(partner_id, !target, target)
            .await
        {
            Ok(partner) => Ok(partner),
            Err(ModerationError::Conflict(_)) => {
                // Someone else flipped it first; if they moved it to where we
                // wanted it, report that instead of a conflict.
                let latest = self.store.get(partner_id).await?;
                if latest.suspicion == target {
                    Err(already_there(latest, target))
                } else {
                    Err(ModerationError::Conflict(partner_id))
                }
            }
            Err(e) => Err(e),
        }
    }
}

fn already_there(partner: Entity, suspicion: bool) -> ModerationError {
    if suspicion {
        ModerationError::AlreadySuspicious(Box::new(partner))
    } else {
        ModerationError::NotSuspicious(Box::new(partner))
    }
}
