//! What automation does with a freshly submitted entity.

use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{Decision, Entity, EntityKind, EntityState};
use crate::domains::moderation::store::EntityStore;

/// Per-kind rule applied in `auto` mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyRule {
    Approve,
    /// Approve only if the owning partner exists, is approved and is not
    /// flagged suspicious.
    ApproveIfOwnerInGoodStanding,
    Hold,
}

/// Why automation left an entity pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    KindRequiresReview,
    OwnerMissing,
    OwnerNotApproved,
    OwnerSuspicious,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    Resolve(Decision),
    Hold(HoldReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutomationPolicy {
    pub booking: PolicyRule,
    pub listing: PolicyRule,
    pub lead: PolicyRule,
    pub partner: PolicyRule,
}

impl Default for AutomationPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

impl AutomationPolicy {
    /// Bookings go straight through, listings need an owner in good
    /// standing, leads and partners always wait for a human.
    pub fn standard() -> Self {
        Self {
            booking: PolicyRule::Approve,
            listing: PolicyRule::ApproveIfOwnerInGoodStanding,
            lead: PolicyRule::Hold,
            partner: PolicyRule::Hold,
        }
    }

    /// Holds everything, even in `auto` mode.
    pub fn manual_only() -> Self {
        Self {
            booking: PolicyRule::Hold,
            listing: PolicyRule::Hold,
            lead: PolicyRule::Hold,
            partner: PolicyRule::Hold,
        }
    }

    pub fn rule_for(&self, kind: EntityKind) -> PolicyRule {
        match kind {
            EntityKind::Booking => self.booking,
            EntityKind::Listing => self.listing,
            EntityKind::Lead => self.lead,
            EntityKind::Partner => self.partner,
        }
    }

    /// Decide what to do with `entity`. Reads the owner from `store` when the
    /// rule depends on it; never writes.
    pub async fn evaluate(
        &self,
        entity: &Entity,
        store: &dyn EntityStore,
    ) -> ModerationResult<PolicyOutcome> {
        match self.rule_for(entity.kind) {
            PolicyRule::Approve => Ok(PolicyOutcome::Resolve(Decision::Approve)),
            PolicyRule::Hold => Ok(PolicyOutcome::Hold(HoldReason::KindRequiresReview)),
            PolicyRule::ApproveIfOwnerInGoodStanding => {
                let Some(owner_id) = entity.owner_id else {
                    return Ok(PolicyOutcome::Hold(HoldReason::OwnerMissing));
                };

                let owner = match store.get(owner_id).await {
                    Ok(owner) => owner,
                    Err(ModerationError::NotFound(_)) => {
                        return Ok(PolicyOutcome::Hold(HoldReason::OwnerMissing))
                    }
                    Err(e) => return Err(e),
                };

                if !owner.is_partner() {
                    return Ok(PolicyOutcome::Hold(HoldReason::OwnerMissing));
                }
                if owner.state != EntityState::Approved {
                    return Ok(PolicyOutcome::Hold(HoldReason::OwnerNotApproved));
                }
                if owner.suspicion {
                    return Ok(PolicyOutcome::Hold(HoldReason::OwnerSuspicious));
                }
                Ok(PolicyOutcome::Resolve(Decision::Approve))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EntityId;
    use crate::domains::moderation::models::Actor;
    use crate::domains::moderation::store::MemoryStore;
    use serde_json::json;

    async fn approved_partner(store: &MemoryStore) -> Entity {
        let partner = store
            .put(Entity::submit(EntityKind::Partner, None, json!({})))
            .await
            .unwrap();
        store
            .compare_and_swap_state(
                partner.id,
                EntityState::Pending,
                EntityState::Approved,
                Actor::System,
            )
            .await
            .unwrap()
    }

    #[test]
    fn test_standard_policy_table() {
        let policy = AutomationPolicy::standard();
        assert_eq!(policy.rule_for(EntityKind::Booking), PolicyRule::Approve);
        assert_eq!(
            policy.rule_for(EntityKind::Listing),
            PolicyRule::ApproveIfOwnerInGoodStanding
        );
        assert_eq!(policy.rule_for(EntityKind::Lead), PolicyRule::Hold);
        assert_eq!(policy.rule_for(EntityKind::Partner), PolicyRule::Hold);
    }

    #[tokio::test]
    async fn test_booking_is_approved_and_lead_is_held() {
        let store = MemoryStore::new();
        let policy = AutomationPolicy::standard();

        let booking = Entity::submit(EntityKind::Booking, None, json!({}));
        let lead = Entity::submit(EntityKind::Lead, None, json!({}));

        assert_eq!(
            policy.evaluate(&booking, &store).await.unwrap(),
            PolicyOutcome::Resolve(Decision::Approve)
        );
        assert_eq!(
            policy.evaluate(&lead, &store).await.unwrap(),
            PolicyOutcome::Hold(HoldReason::KindRequiresReview)
        );
    }

    #[tokio::test]
    async fn test_listing_follows_owner_standing() {
        let store = MemoryStore::new();
        let policy = AutomationPolicy::standard();
        let owner = approved_partner(&store).await;

        let listing = Entity::submit(EntityKind::Listing, Some(owner.id), json!({}));
        assert_eq!(
            policy.evaluate(&listing, &store).await.unwrap(),
            PolicyOutcome::Resolve(Decision::Approve)
        );

        store
            .compare_and_swap_suspicion(owner.id, false, true)
            .await
            .unwrap();
        assert_eq!(
            policy.evaluate(&listing, &store).await.unwrap(),
            PolicyOutcome::Hold(HoldReason::OwnerSuspicious)
        );
    }

    #[tokio::test]
    async fn test_listing_without_approved_owner_is_held() {
        let store = MemoryStore::new();
        let policy = AutomationPolicy::standard();

        let orphan = Entity::submit(EntityKind::Listing, None, json!({}));
        assert_eq!(
            policy.evaluate(&orphan, &store).await.unwrap(),
            PolicyOutcome::Hold(HoldReason::OwnerMissing)
        );

        let dangling = Entity::submit(EntityKind::Listing, Some(EntityId::new()), json!({}));
        assert_eq!(
            policy.evaluate(&dangling, &store).await.unwrap(),
            PolicyOutcome::Hold(HoldReason::OwnerMissing)
        );

        let pending_owner = store
            .put(Entity::submit(EntityKind::Partner, None, json!({})))
            .await
            .unwrap();
        let listing = Entity::submit(EntityKind::Listing, Some(pending_owner.id), json!({}));
        assert_eq!(
            policy.evaluate(&listing, &store).await.unwrap(),
            PolicyOutcome::Hold(HoldReason::OwnerNotApproved)
        );
    }

    #[tokio::test]
    async fn test_manual_only_holds_bookings() {
        let store = MemoryStore::new();
        let booking = Entity::submit(EntityKind::Booking, None, json!({}));
        assert_eq!(
            AutomationPolicy::manual_only()
                .evaluate(&booking, &store)
                .await
                .unwrap(),
            PolicyOutcome::Hold(HoldReason::KindRequiresReview)
        );
    }
}
