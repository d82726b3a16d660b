//! Moderation mutation actions
//!
//! Every write goes through one of these. Admin commands take the caller's
//! `AdminId`; automation never calls in here, it runs inside `submit_entity`.

use tracing::info;

use crate::common::{AdminId, EntityId, ModeChangeToken};
use crate::domains::moderation::automation::{ModeChangeOutcome, ModeChangeRequest};
use crate::domains::moderation::data::{CommandOutcome, NoOpCode, SubmitEntityInput};
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{
    Actor, AutomationMode, Decision, Entity, EntityKind, EntityState,
};
use crate::kernel::ServerDeps;

/// Store a new pending entity and, in auto mode, let the policy resolve it.
///
/// The mode is read before the write so the entity is handled under the
/// mode that was in effect when it arrived.
pub async fn submit_entity(input: SubmitEntityInput, deps: &ServerDeps) -> ModerationResult<Entity> {
    let kind = input.kind.parse::<EntityKind>()?;
    let owner_id = input
        .owner_id
        .as_deref()
        .map(EntityId::parse)
        .transpose()?;

    let mode = deps.automation.get_mode().await?;
    let stored = deps
        .store
        .put(Entity::submit(kind, owner_id, input.payload))
        .await?;

    info!(entity_id = %stored.id, kind = %kind, mode = %mode, "Entity submitted");

    deps.automation.on_entity_submitted(stored, mode).await
}

/// Approve or reject a pending entity on behalf of an admin.
///
/// Repeating the decision that already stands is a no-op; trying to flip a
/// resolved entity is still `AlreadyResolved`.
pub async fn resolve_entity(
    entity_id: &str,
    decision: Decision,
    admin: AdminId,
    deps: &ServerDeps,
) -> ModerationResult<CommandOutcome<Entity>> {
    let id = EntityId::parse(entity_id)?;
    let result = deps.transitions.resolve(id, decision, Actor::Admin(admin)).await;
    fold_repeated_decision(result, decision)
}

/// Approve a referred customer lead.
pub async fn approve_lead(
    lead_id: &str,
    admin: AdminId,
    deps: &ServerDeps,
) -> ModerationResult<CommandOutcome<Entity>> {
    let id = EntityId::parse(lead_id)?;
    let lead = deps.store.get(id).await?;
    if lead.kind != EntityKind::Lead {
        return Err(ModerationError::InvalidKind {
            id,
            actual: lead.kind,
            expected: EntityKind::Lead,
        });
    }

    let result = deps
        .transitions
        .resolve(id, Decision::Approve, Actor::Admin(admin))
        .await;
    fold_repeated_decision(result, Decision::Approve)
}

pub async fn mark_partner_suspicious(
    partner_id: &str,
    admin: AdminId,
    deps: &ServerDeps,
) -> ModerationResult<CommandOutcome<Entity>> {
    let id = EntityId::parse(partner_id)?;
    info!(partner_id = %id, admin = %admin, "Marking partner suspicious");

    match deps.suspicious.mark_suspicious(id).await {
        Ok(partner) => Ok(CommandOutcome::Applied(partner)),
        Err(ModerationError::AlreadySuspicious(current)) => Ok(CommandOutcome::NoOp {
            current: *current,
            code: NoOpCode::AlreadySuspicious,
        }),
        Err(e) => Err(e),
    }
}

pub async fn unmark_partner_suspicious(
    partner_id: &str,
    admin: AdminId,
    deps: &ServerDeps,
) -> ModerationResult<CommandOutcome<Entity>> {
    let id = EntityId::parse(partner_id)?;
    info!(partner_id = %id, admin = %admin, "Removing partner suspicion");

    match deps.suspicious.unmark_suspicious(id).await {
        Ok(partner) => Ok(CommandOutcome::Applied(partner)),
        Err(ModerationError::NotSuspicious(current)) => Ok(CommandOutcome::NoOp {
            current: *current,
            code: NoOpCode::NotSuspicious,
        }),
        Err(e) => Err(e),
    }
}

pub async fn request_mode_change(
    mode: &str,
    admin: AdminId,
    deps: &ServerDeps,
) -> ModerationResult<ModeChangeRequest> {
    let mode = mode.parse::<AutomationMode>()?;
    deps.automation.request_mode_change(mode, admin).await
}

/// Confirm a pending mode change.
///
/// With `expected`, the token must have been issued for that mode.
pub async fn confirm_mode_change(
    token: &str,
    expected: Option<AutomationMode>,
    deps: &ServerDeps,
) -> ModerationResult<CommandOutcome<ModeChangeOutcome>> {
    let token = ModeChangeToken::parse(token)?;
    let outcome = match expected {
        Some(mode) => deps.automation.confirm_mode_change_to(token, mode).await?,
        None => deps.automation.confirm_mode_change(token).await?,
    };

    if outcome.changed {
        Ok(CommandOutcome::Applied(outcome))
    } else {
        Ok(CommandOutcome::NoOp {
            current: outcome,
            code: NoOpCode::AlreadyInMode,
        })
    }
}

pub async fn cancel_mode_change(token: &str, deps: &ServerDeps) -> ModerationResult<()> {
    let token = ModeChangeToken::parse(token)?;
    deps.automation.cancel_mode_change(token)
}

fn fold_repeated_decision(
    result: ModerationResult<Entity>,
    decision: Decision,
) -> ModerationResult<CommandOutcome<Entity>> {
    match result {
        Ok(entity) => Ok(CommandOutcome::Applied(entity)),
        Err(ModerationError::AlreadyResolved(current))
            if current.state == decision.target_state() =>
        {
            let code = match current.state {
                EntityState::Rejected => NoOpCode::AlreadyRejected,
                _ => NoOpCode::AlreadyApproved,
            };
            Ok(CommandOutcome::NoOp {
                current: *current,
                code,
            })
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::moderation::automation::DEFAULT_REQUEST_TTL_SECS;
    use serde_json::json;

    fn deps() -> ServerDeps {
        ServerDeps::in_memory(chrono::Duration::seconds(DEFAULT_REQUEST_TTL_SECS))
    }

    fn admin(id: &str) -> AdminId {
        AdminId::parse(id).unwrap()
    }

    fn input(kind: &str, owner_id: Option<EntityId>) -> SubmitEntityInput {
        SubmitEntityInput {
            kind: kind.to_string(),
            owner_id: owner_id.map(|id| id.to_string()),
            payload: json!({"source": "test"}),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_unknown_kind() {
        let deps = deps();
        let result = submit_entity(input("property", None), &deps).await;
        assert!(matches!(result, Err(ModerationError::UnknownKind(_))));
    }

    #[tokio::test]
    async fn test_repeated_approval_is_noop() {
        let deps = deps();
        let booking = submit_entity(input("booking", None), &deps).await.unwrap();
        let id = booking.id.to_string();

        let first = resolve_entity(&id, Decision::Approve, admin("admin-1"), &deps)
            .await
            .unwrap();
        assert!(!first.is_noop());

        let second = resolve_entity(&id, Decision::Approve, admin("admin-2"), &deps)
            .await
            .unwrap();
        match second {
            CommandOutcome::NoOp { current, code } => {
                assert_eq!(code, NoOpCode::AlreadyApproved);
                assert_eq!(current.resolved_by, Some(Actor::Admin(admin("admin-1"))));
            }
            other => panic!("expected NoOp, got {:?}", other),
        }

        let flip = resolve_entity(&id, Decision::Reject, admin("admin-2"), &deps).await;
        assert!(matches!(flip, Err(ModerationError::AlreadyResolved(_))));
    }

    #[tokio::test]
    async fn test_approve_lead_refuses_other_kinds() {
        let deps = deps();
        let booking = submit_entity(input("booking", None), &deps).await.unwrap();

        let result = approve_lead(&booking.id.to_string(), admin("admin-1"), &deps).await;
        assert!(matches!(
            result,
            Err(ModerationError::InvalidKind {
                expected: EntityKind::Lead,
                ..
            })
        ));

        let lead = submit_entity(input("lead", None), &deps).await.unwrap();
        let approved = approve_lead(&lead.id.to_string(), admin("admin-1"), &deps)
            .await
            .unwrap()
            .into_inner();
        assert_eq!(approved.state, EntityState::Approved);
    }

    #[tokio::test]
    async fn test_rejecting_suspicious_partner_clears_flag() {
        let deps = deps();
        let partner = submit_entity(input("partner", None), &deps).await.unwrap();
        let id = partner.id.to_string();

        mark_partner_suspicious(&id, admin("admin-1"), &deps)
            .await
            .unwrap();
        let rejected = resolve_entity(&id, Decision::Reject, admin("admin-1"), &deps)
            .await
            .unwrap()
            .into_inner();

        assert!(!rejected.suspicion);
        assert!(get_suspicious_partners_ids(&deps).await.is_empty());
    }

    #[tokio::test]
    async fn test_confirm_same_mode_reports_already_in_mode() {
        let deps = deps();
        let request = request_mode_change("manual", admin("admin-1"), &deps)
            .await
            .unwrap();

        let outcome = confirm_mode_change(&request.token.to_string(), None, &deps)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            CommandOutcome::NoOp {
                code: NoOpCode::AlreadyInMode,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_request_mode_change_rejects_garbage_mode() {
        let deps = deps();
        let result = request_mode_change("sometimes", admin("admin-1"), &deps).await;
        assert!(matches!(result, Err(ModerationError::InvalidMode(_))));
    }

    async fn get_suspicious_partners_ids(deps: &ServerDeps) -> Vec<EntityId> {
        crate::domains::moderation::actions::get_suspicious_partners(deps)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect()
    }
}
