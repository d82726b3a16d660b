//! Moderation query actions

use tracing::debug;

use crate::common::EntityId;
use crate::domains::moderation::data::{PendingCounts, QueueQuery};
use crate::domains::moderation::errors::ModerationResult;
use crate::domains::moderation::models::{AutomationFlag, Entity, EntityKind, EntityState};
use crate::kernel::ServerDeps;

/// Get a single entity by id
pub async fn get_entity(entity_id: &str, deps: &ServerDeps) -> ModerationResult<Entity> {
    let id = EntityId::parse(entity_id)?;
    deps.store.get(id).await
}

/// FIFO queue for a kind/state pair. State defaults to pending.
pub async fn list_queue(query: QueueQuery, deps: &ServerDeps) -> ModerationResult<Vec<Entity>> {
    let kind = query.kind.parse::<EntityKind>()?;
    let state = match query.state.as_deref() {
        Some(state) => state.parse::<EntityState>()?,
        None => EntityState::Pending,
    };

    debug!(kind = %kind, state = %state, "Listing queue");
    deps.store.list_by_kind_and_state(kind, state).await
}

/// Bookings waiting for an admin decision
pub async fn get_bookings_for_approval(deps: &ServerDeps) -> ModerationResult<Vec<Entity>> {
    deps.store
        .list_by_kind_and_state(EntityKind::Booking, EntityState::Pending)
        .await
}

/// Active partners that are not flagged
pub async fn get_normal_partners(deps: &ServerDeps) -> ModerationResult<Vec<Entity>> {
    deps.suspicious.list_normal().await
}

pub async fn get_suspicious_partners(deps: &ServerDeps) -> ModerationResult<Vec<Entity>> {
    deps.suspicious.list_suspicious().await
}

pub async fn get_automation_flag(deps: &ServerDeps) -> ModerationResult<AutomationFlag> {
    deps.automation.flag().await
}

/// Pending entities per kind
pub async fn get_pending_counts(deps: &ServerDeps) -> ModerationResult<PendingCounts> {
    let mut counts = PendingCounts::default();
    for kind in EntityKind::ALL {
        let count = deps
            .store
            .count_by_kind_and_state(kind, EntityState::Pending)
            .await?;
        counts.set(kind, count);
    }
    Ok(counts)
}
