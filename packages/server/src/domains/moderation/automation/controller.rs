//! Automation mode switch and auto-resolution of new submissions.
//!
//! Changing the mode is a two-step handshake: `request_mode_change` hands out
//! a single-use token bound to the flag version it saw, and
//! `confirm_mode_change` redeems it with a compare-and-swap on that version.
//! Two admins racing on stale screens cannot silently overwrite each other.
//! A redeemed token is remembered until it would have expired, so a client
//! retrying a confirm whose response it lost gets a no-op instead of an error.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::policy::{AutomationPolicy, PolicyOutcome};
use crate::common::{AdminId, ModeChangeToken};
use crate::domains::moderation::errors::{ModerationError, ModerationResult};
use crate::domains::moderation::models::{Actor, AutomationFlag, AutomationMode, Entity};
use crate::domains::moderation::store::{EntityStore, FlagStore};
use crate::domains::moderation::transitions::TransitionEngine;

/// Default lifetime of an unconfirmed mode change request.
pub const DEFAULT_REQUEST_TTL_SECS: i64 = 300;

#[derive(Debug, Clone)]
struct PendingModeChange {
    mode: AutomationMode,
    observed_version: i64,
    requested_by: AdminId,
    expires_at: DateTime<Utc>,
}

/// A confirmed request, kept to answer repeated confirms
#[derive(Debug, Clone)]
struct RedeemedModeChange {
    mode: AutomationMode,
    expires_at: DateTime<Utc>,
}

/// Returned by the request step; the token must be echoed back to confirm.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChangeRequest {
    #[serde(rename = "confirmationToken")]
    pub token: ModeChangeToken,
    pub mode: AutomationMode,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeChangeOutcome {
    pub flag: AutomationFlag,
    /// `false` when the confirmed mode was already in effect
    pub changed: bool,
}

pub struct AutomationController {
    flags: Arc<dyn FlagStore>,
    store: Arc<dyn EntityStore>,
    transitions: TransitionEngine,
    policy: AutomationPolicy,
    pending: DashMap<ModeChangeToken, PendingModeChange>,
    redeemed: DashMap<ModeChangeToken, RedeemedModeChange>,
    request_ttl: Duration,
}

impl AutomationController {
    pub fn new(
        flags: Arc<dyn FlagStore>,
        store: Arc<dyn EntityStore>,
        transitions: TransitionEngine,
        policy: AutomationPolicy,
        request_ttl: Duration,
    ) -> Self {
        Self {
            flags,
            store,
            transitions,
            policy,
            pending: DashMap::new(),
            redeemed: DashMap::new(),
            request_ttl,
        }
    }

    pub fn policy(&self) -> &AutomationPolicy {
        &self.policy
    }

    pub async fn get_mode(&self) -> ModerationResult<AutomationMode> {
        Ok(self.flags.load_or_init().await?.mode)
    }

    pub async fn flag(&self) -> ModerationResult<AutomationFlag> {
        self.flags.load_or_init().await
    }

    /// First step of a mode change. Never touches the flag.
    pub async fn request_mode_change(
        &self,
        mode: AutomationMode,
        requested_by: AdminId,
    ) -> ModerationResult<ModeChangeRequest> {
        let flag = self.flags.load_or_init().await?;
        let now = Utc::now();
        self.purge_expired(now);

        let token = ModeChangeToken::new();
        let expires_at = now + self.request_ttl;
        self.pending.insert(
            token,
            PendingModeChange {
                mode,
                observed_version: flag.version,
                requested_by: requested_by.clone(),
                expires_at,
            },
        );

        info!(
            mode = %mode,
            observed_version = flag.version,
            requested_by = %requested_by,
            "Mode change requested"
        );

        Ok(ModeChangeRequest {
            token,
            mode,
            expires_at,
        })
    }

    /// Second step: redeem `token` and apply the requested mode.
    ///
    /// The pending request is consumed whatever the outcome. Confirming a
    /// token that already went through answers `changed: false` while the
    /// flag still holds the mode it applied.
    pub async fn confirm_mode_change(
        &self,
        token: ModeChangeToken,
    ) -> ModerationResult<ModeChangeOutcome> {
        match self.pending.remove(&token) {
            Some((_, request)) => self.apply(token, request).await,
            None => self.replay(token, None).await,
        }
    }

    /// Like [`Self::confirm_mode_change`], but only redeems a token that was
    /// issued for `expected`. A mismatch leaves the token usable.
    pub async fn confirm_mode_change_to(
        &self,
        token: ModeChangeToken,
        expected: AutomationMode,
    ) -> ModerationResult<ModeChangeOutcome> {
        if let Some((_, request)) = self
            .pending
            .remove_if(&token, |_, request| request.mode == expected)
        {
            return self.apply(token, request).await;
        }
        if let Some(request) = self.pending.get(&token) {
            return Err(wrong_mode(request.mode, expected));
        }
        self.replay(token, Some(expected)).await
    }

    /// Drop an unconfirmed request.
    pub fn cancel_mode_change(&self, token: ModeChangeToken) -> ModerationResult<()> {
        match self.pending.remove(&token) {
            Some((_, request)) => {
                debug!(mode = %request.mode, requested_by = %request.requested_by, "Mode change cancelled");
                Ok(())
            }
            None => Err(ModerationError::UnknownToken),
        }
    }

    async fn apply(
        &self,
        token: ModeChangeToken,
        request: PendingModeChange,
    ) -> ModerationResult<ModeChangeOutcome> {
        if request.expires_at <= Utc::now() {
            return Err(ModerationError::TokenExpired);
        }

        let current = self.flags.load_or_init().await?;
        if current.version != request.observed_version {
            warn!(
                observed_version = request.observed_version,
                current_version = current.version,
                requested_by = %request.requested_by,
                "Stale mode change confirmation"
            );
            return Err(ModerationError::ModeConflict { current });
        }
        if current.mode == request.mode {
            self.remember(token, &request);
            return Ok(ModeChangeOutcome {
                flag: current,
                changed: false,
            });
        }

        let flag = self
            .flags
            .compare_and_swap_mode(
                request.observed_version,
                request.mode,
                Actor::Admin(request.requested_by.clone()),
            )
            .await?;
        self.remember(token, &request);

        info!(
            mode = %flag.mode,
            version = flag.version,
            updated_by = %flag.updated_by,
            "Automation mode changed"
        );

        Ok(ModeChangeOutcome {
            flag,
            changed: true,
        })
    }

    fn remember(&self, token: ModeChangeToken, request: &PendingModeChange) {
        self.redeemed.insert(
            token,
            RedeemedModeChange {
                mode: request.mode,
                expires_at: request.expires_at,
            },
        );
    }

    /// Answer a confirm for a token that is no longer pending.
    async fn replay(
        &self,
        token: ModeChangeToken,
        expected: Option<AutomationMode>,
    ) -> ModerationResult<ModeChangeOutcome> {
        let redeemed = self
            .redeemed
            .get(&token)
            .map(|entry| entry.value().clone())
            .ok_or(ModerationError::UnknownToken)?;

        if redeemed.expires_at <= Utc::now() {
            self.redeemed.remove(&token);
            return Err(ModerationError::TokenExpired);
        }
        if let Some(expected) = expected {
            if redeemed.mode != expected {
                return Err(wrong_mode(redeemed.mode, expected));
            }
        }

        let current = self.flags.load_or_init().await?;
        if current.mode != redeemed.mode {
            return Err(ModerationError::ModeConflict { current });
        }

        debug!(mode = %current.mode, version = current.version, "Repeated mode change confirmation");
        Ok(ModeChangeOutcome {
            flag: current,
            changed: false,
        })
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.pending.retain(|_, request| request.expires_at > now);
        self.redeemed.retain(|_, redeemed| redeemed.expires_at > now);
    }

    /// Hook run synchronously after a submission is stored.
    ///
    /// `mode_at_submission` is the mode read before the entity was stored, so
    /// a mode change confirmed mid-request does not apply to it. Returns the
    /// entity as it stands afterwards.
    pub async fn on_entity_submitted(
        &self,
        entity: Entity,
        mode_at_submission: AutomationMode,
    ) -> ModerationResult<Entity> {
        if mode_at_submission == AutomationMode::Manual {
            return Ok(entity);
        }

        match self.policy.evaluate(&entity, self.store.as_ref()).await? {
            PolicyOutcome::Hold(reason) => {
                debug!(entity_id = %entity.id, kind = %entity.kind, reason = ?reason, "Held for review");
                Ok(entity)
            }
            PolicyOutcome::Resolve(decision) => {
                match self
                    .transitions
                    .resolve(entity.id, decision, Actor::System)
                    .await
                {
                    Ok(resolved) => Ok(resolved),
                    Err(ModerationError::AlreadyResolved(current))
                    | Err(ModerationError::InvalidState(current)) => {
                        info!(
                            entity_id = %entity.id,
                            state = %current.state,
                            "Admin resolved entity before automation"
                        );
                        Ok(*current)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn wrong_mode(issued_for: AutomationMode, expected: AutomationMode) -> ModerationError {
    ModerationError::InvalidMode(format!(
        "token was issued for {}, not {}",
        issued_for, expected
    ))
}
