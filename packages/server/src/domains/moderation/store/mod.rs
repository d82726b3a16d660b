//! Persistence seams for the moderation engine.
//!
//! `EntityStore` exclusively owns entity records; `FlagStore` owns the
//! automation flag singleton. Both expose compare-and-swap as the only way to
//! mutate state so concurrent writers get an explicit `Conflict` instead of a
//! silent overwrite.

use async_trait::async_trait;

use crate::common::EntityId;
use crate::domains::moderation::errors::ModerationResult;
use crate::domains::moderation::models::{
    Actor, AutomationFlag, AutomationMode, Entity, EntityKind, EntityState,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

// =============================================================================
// Entity storage
// =============================================================================

#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a newly submitted entity.
    ///
    /// Fails with `Conflict` on a duplicate id and `InvalidState` if the
    /// entity is not a clean pending record.
    async fn put(&self, entity: Entity) -> ModerationResult<Entity>;

    /// Fetch by id, `NotFound` if absent.
    async fn get(&self, id: EntityId) -> ModerationResult<Entity>;

    /// Entities of a kind in a state, oldest `submitted_at` first.
    async fn list_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<Vec<Entity>>;

    /// Move `id` from `expected` to `new`, stamping `resolved_at`/`resolved_by`.
    ///
    /// `Conflict` if the current state is not `expected`. Rejecting a partner
    /// clears its suspicion flag in the same write.
    async fn compare_and_swap_state(
        &self,
        id: EntityId,
        expected: EntityState,
        new: EntityState,
        resolved_by: Actor,
    ) -> ModerationResult<Entity>;

    /// Flip the suspicion flag of an active partner from `expected` to `new`.
    async fn compare_and_swap_suspicion(
        &self,
        id: EntityId,
        expected: bool,
        new: bool,
    ) -> ModerationResult<Entity>;

    /// Active partners (pending or approved) with the given suspicion flag, FIFO.
    async fn list_partners(&self, suspicion: bool) -> ModerationResult<Vec<Entity>>;

    async fn count_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<u64>;

    /// Cheap liveness probe for the health endpoint.
    async fn health_check(&self) -> ModerationResult<()> {
        Ok(())
    }
}

// =============================================================================
// Automation flag storage
// =============================================================================

#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Return the flag, creating it as `manual` on first use.
    async fn load_or_init(&self) -> ModerationResult<AutomationFlag>;

    /// Write `mode` if the stored version still equals `expected_version`.
    ///
    /// Fails with `ModeConflict` carrying the current flag otherwise.
    async fn compare_and_swap_mode(
        &self,
        expected_version: i64,
        mode: AutomationMode,
        updated_by: Actor,
    ) -> ModerationResult<AutomationFlag>;
}
