//! Request and response shapes for the moderation HTTP surface.

use serde::{Deserialize, Serialize};

use crate::domains::moderation::models::EntityKind;

/// Body of `POST /api/moderation/entities`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEntityInput {
    pub kind: String,
    pub owner_id: Option<String>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Body of the mark/remove suspicious commands
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartnerIdInput {
    pub partner_id: String,
}

/// Body of the lead approval command
#[derive(Debug, Clone, Deserialize)]
pub struct LeadIdInput {
    pub id: String,
}

/// Body of `PUT /api/admin/Change_toAuto` and `Change_toManual`.
///
/// No token means "start a change", a token means "confirm it".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeChangeInput {
    pub confirmation_token: Option<String>,
}

/// Body of `POST /api/admin/automation/requests`
#[derive(Debug, Clone, Deserialize)]
pub struct ModeRequestInput {
    pub mode: String,
}

/// Body of `POST /api/admin/automation/confirm`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmModeInput {
    pub confirmation_token: String,
}

/// Query string of `GET /api/moderation/queue`
#[derive(Debug, Clone, Deserialize)]
pub struct QueueQuery {
    pub kind: String,
    pub state: Option<String>,
}

/// Pending work per kind, for the dashboard counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCounts {
    pub booking: u64,
    pub listing: u64,
    pub lead: u64,
    pub partner: u64,
}

impl PendingCounts {
    pub fn set(&mut self, kind: EntityKind, count: u64) {
        match kind {
            EntityKind::Booking => self.booking = count,
            EntityKind::Listing => self.listing = count,
            EntityKind::Lead => self.lead = count,
            EntityKind::Partner => self.partner = count,
        }
    }
}

/// Why a command left the record untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoOpCode {
    AlreadySuspicious,
    NotSuspicious,
    AlreadyApproved,
    AlreadyRejected,
    AlreadyInMode,
}

/// Result of an idempotent admin command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome<T> {
    Applied(T),
    /// The record was already in the requested state
    NoOp { current: T, code: NoOpCode },
}

impl<T> CommandOutcome<T> {
    pub fn is_noop(&self) -> bool {
        matches!(self, CommandOutcome::NoOp { .. })
    }

    pub fn into_inner(self) -> T {
        match self {
            CommandOutcome::Applied(value) => value,
            CommandOutcome::NoOp { current, .. } => current,
        }
    }
}
