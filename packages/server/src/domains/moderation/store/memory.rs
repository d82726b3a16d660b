//! Process-local store backed by dashmap.
//!
//! Each entry's shard lock is held for the whole read-check-write of a
//! compare-and-swap, which is what makes the CAS atomic here.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{EntityStore, FlagStore};
use crate::common::EntityId;
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{
    Actor, AutomationFlag, AutomationMode, Entity, EntityKind, EntityState,
};

#[derive(Default)]
pub struct MemoryStore {
    entities: DashMap<EntityId, Entity>,
    flag: Mutex<Option<AutomationFlag>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect_sorted<F>(&self, predicate: F) -> Vec<Entity>
    where
        F: Fn(&Entity) -> bool,
    {
        let mut entities: Vec<Entity> = self
            .entities
            .iter()
            .filter(|entry| predicate(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        entities.sort_by(|a, b| {
            a.submitted_at
                .cmp(&b.submitted_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        entities
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn put(&self, entity: Entity) -> ModerationResult<Entity> {
        if !entity.state.is_pending() || !entity.invariants_hold() || entity.suspicion {
            return Err(ModerationError::InvalidState(Box::new(entity)));
        }

        match self.entities.entry(entity.id) {
            Entry::Occupied(_) => Err(ModerationError::Conflict(entity.id)),
            Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                Ok(entity)
            }
        }
    }

    async fn get(&self, id: EntityId) -> ModerationResult<Entity> {
        self.entities
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(ModerationError::NotFound(id))
    }

    async fn list_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<Vec<Entity>> {
        Ok(self.collect_sorted(|e| e.kind == kind && e.state == state))
    }

    async fn compare_and_swap_state(
        &self,
        id: EntityId,
        expected: EntityState,
        new: EntityState,
        resolved_by: Actor,
    ) -> ModerationResult<Entity> {
        let mut entry = self
            .entities
            .get_mut(&id)
            .ok_or(ModerationError::NotFound(id))?;
        let entity = entry.value_mut();

        if entity.state != expected {
            return Err(ModerationError::Conflict(id));
        }
        if !expected.can_transition_to(new) {
            return Err(ModerationError::InvalidState(Box::new(entity.clone())));
        }

        entity.resolve(new, resolved_by, Utc::now());
        Ok(entity.clone())
    }

    async fn compare_and_swap_suspicion(
        &self,
        id: EntityId,
        expected: bool,
        new: bool,
    ) -> ModerationResult<Entity> {
        let mut entry = self
            .entities
            .get_mut(&id)
            .ok_or(ModerationError::NotFound(id))?;
        let entity = entry.value_mut();

        if !entity.is_partner() {
            return Err(ModerationError::InvalidKind {
                id,
                actual: entity.kind,
                expected: EntityKind::Partner,
            });
        }
        if !entity.is_active_partner() {
            return Err(ModerationError::InvalidState(Box::new(entity.clone())));
        }
        if entity.suspicion != expected {
            return Err(ModerationError::Conflict(id));
        }

        entity.suspicion = new;
        Ok(entity.clone())
    }

    async fn list_partners(&self, suspicion: bool) -> ModerationResult<Vec<Entity>> {
        Ok(self.collect_sorted(|e| e.is_active_partner() && e.suspicion == suspicion))
    }

    async fn count_by_kind_and_state(
        &self,
        kind: EntityKind,
        state: EntityState,
    ) -> ModerationResult<u64> {
        let count = self
            .entities
            .iter()
            .filter(|entry| entry.kind == kind && entry.state == state)
            .count();
        Ok(count as u64)
    }
}

#[async_trait]
impl FlagStore for MemoryStore {
    async fn load_or_init(&self) -> ModerationResult<AutomationFlag> {
        let mut flag = self.flag.lock().await;
        Ok(flag.get_or_insert_with(AutomationFlag::initial).clone())
    }

    async fn compare_and_swap_mode(
        &self,
        expected_version: i64,
        mode: AutomationMode,
        updated_by: Actor,
    ) -> ModerationResult<AutomationFlag> {
        let mut guard = self.flag.lock().await;
        let current = guard.get_or_insert_with(AutomationFlag::initial);

        if current.version != expected_version {
            return Err(ModerationError::ModeConflict {
                current: current.clone(),
            });
        }

        *current = AutomationFlag {
            mode,
            version: current.version + 1,
            updated_at: Utc::now(),
            updated_by,
        };
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::AdminId;
    use serde_json::json;

    fn admin(id: &str) -> Actor {
        Actor::Admin(AdminId::parse(id).unwrap())
    }

    #[tokio::test]
    async fn test_put_rejects_duplicate_id() {
        let store = MemoryStore::new();
        let entity = Entity::submit(EntityKind::Booking, None, json!({}));

        store.put(entity.clone()).await.unwrap();
        let result = store.put(entity.clone()).await;

        assert!(matches!(result, Err(ModerationError::Conflict(id)) if id == entity.id));
    }

    #[tokio::test]
    async fn test_put_rejects_resolved_entity() {
        let store = MemoryStore::new();
        let mut entity = Entity::submit(EntityKind::Booking, None, json!({}));
        entity.resolve(EntityState::Approved, Actor::System, Utc::now());

        let result = store.put(entity).await;
        assert!(matches!(result, Err(ModerationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let store = MemoryStore::new();
        let id = EntityId::new();
        assert!(matches!(store.get(id).await, Err(ModerationError::NotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_list_is_fifo_by_submission_time() {
        let store = MemoryStore::new();
        let mut older = Entity::submit(EntityKind::Lead, None, json!({"n": 1}));
        let newer = Entity::submit(EntityKind::Lead, None, json!({"n": 2}));
        older.submitted_at = newer.submitted_at - chrono::Duration::minutes(5);

        // Insert newest first to make sure ordering does not follow insertion
        store.put(newer.clone()).await.unwrap();
        store.put(older.clone()).await.unwrap();

        let pending = store
            .list_by_kind_and_state(EntityKind::Lead, EntityState::Pending)
            .await
            .unwrap();
        let ids: Vec<EntityId> = pending.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[tokio::test]
    async fn test_cas_state_conflicts_on_stale_expectation() {
        let store = MemoryStore::new();
        let entity = store
            .put(Entity::submit(EntityKind::Booking, None, json!({})))
            .await
            .unwrap();

        let approved = store
            .compare_and_swap_state(entity.id, EntityState::Pending, EntityState::Approved, admin("a1"))
            .await
            .unwrap();
        assert_eq!(approved.state, EntityState::Approved);
        assert!(approved.resolved_at.is_some());

        let second = store
            .compare_and_swap_state(entity.id, EntityState::Pending, EntityState::Rejected, admin("a2"))
            .await;
        assert!(matches!(second, Err(ModerationError::Conflict(_))));

        let stored = store.get(entity.id).await.unwrap();
        assert_eq!(stored.state, EntityState::Approved);
        assert_eq!(stored.resolved_by, Some(admin("a1")));
    }

    #[tokio::test]
    async fn test_cas_state_refuses_reversal() {
        let store = MemoryStore::new();
        let entity = store
            .put(Entity::submit(EntityKind::Booking, None, json!({})))
            .await
            .unwrap();
        store
            .compare_and_swap_state(entity.id, EntityState::Pending, EntityState::Approved, Actor::System)
            .await
            .unwrap();

        let reversal = store
            .compare_and_swap_state(entity.id, EntityState::Approved, EntityState::Rejected, admin("a1"))
            .await;
        assert!(matches!(reversal, Err(ModerationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_cas_suspicion_only_on_active_partners() {
        let store = MemoryStore::new();
        let lead = store
            .put(Entity::submit(EntityKind::Lead, None, json!({})))
            .await
            .unwrap();
        let result = store.compare_and_swap_suspicion(lead.id, false, true).await;
        assert!(matches!(result, Err(ModerationError::InvalidKind { .. })));

        let partner = store
            .put(Entity::submit(EntityKind::Partner, None, json!({})))
            .await
            .unwrap();
        store
            .compare_and_swap_state(partner.id, EntityState::Pending, EntityState::Rejected, admin("a1"))
            .await
            .unwrap();
        let result = store.compare_and_swap_suspicion(partner.id, false, true).await;
        assert!(matches!(result, Err(ModerationError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_flag_cas_bumps_version_and_detects_stale_writers() {
        let store = MemoryStore::new();
        let initial = store.load_or_init().await.unwrap();
        assert_eq!(initial.mode, AutomationMode::Manual);

        let updated = store
            .compare_and_swap_mode(initial.version, AutomationMode::Auto, admin("a1"))
            .await
            .unwrap();
        assert_eq!(updated.version, initial.version + 1);
        assert_eq!(updated.mode, AutomationMode::Auto);

        let stale = store
            .compare_and_swap_mode(initial.version, AutomationMode::Manual, admin("a2"))
            .await;
        match stale {
            Err(ModerationError::ModeConflict { current }) => {
                assert_eq!(current.mode, AutomationMode::Auto);
            }
            other => panic!("expected ModeConflict, got {:?}", other),
        }
    }
}
