use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::common::{AdminId, EntityId, SYSTEM_ACTOR};
use crate::domains::moderation::errors::ModerationError;

/// Kind of moderatable record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Booking,
    Listing,
    Lead,
    Partner,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Booking,
        EntityKind::Listing,
        EntityKind::Lead,
        EntityKind::Partner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Booking => "booking",
            EntityKind::Listing => "listing",
            EntityKind::Lead => "lead",
            EntityKind::Partner => "partner",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(EntityKind::Booking),
            "listing" => Ok(EntityKind::Listing),
            "lead" => Ok(EntityKind::Lead),
            "partner" => Ok(EntityKind::Partner),
            other => Err(ModerationError::UnknownKind(other.to_string())),
        }
    }
}

/// Approval state. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityState {
    Pending,
    Approved,
    Rejected,
}

impl EntityState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityState::Pending => "pending",
            EntityState::Approved => "approved",
            EntityState::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, EntityState::Pending)
    }

    /// The only legal edges are pending -> approved and pending -> rejected.
    pub fn can_transition_to(&self, next: EntityState) -> bool {
        matches!(
            (self, next),
            (EntityState::Pending, EntityState::Approved)
                | (EntityState::Pending, EntityState::Rejected)
        )
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityState {
    type Err = ModerationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntityState::Pending),
            "approved" => Ok(EntityState::Approved),
            "rejected" => Ok(EntityState::Rejected),
            other => Err(ModerationError::UnknownState(other.to_string())),
        }
    }
}

/// Admin or automation decision on a pending entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target_state(&self) -> EntityState {
        match self {
            Decision::Approve => EntityState::Approved,
            Decision::Reject => EntityState::Rejected,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Approve => f.write_str("approve"),
            Decision::Reject => f.write_str("reject"),
        }
    }
}

/// Who produced a resolution or a flag change.
///
/// Serialized as `"system"` or the bare admin id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Actor {
    System,
    Admin(AdminId),
}

impl Actor {
    pub fn is_system(&self) -> bool {
        matches!(self, Actor::System)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::System => f.write_str(SYSTEM_ACTOR),
            Actor::Admin(id) => write!(f, "{}", id),
        }
    }
}

impl TryFrom<String> for Actor {
    type Error = crate::common::IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == SYSTEM_ACTOR {
            return Ok(Actor::System);
        }
        AdminId::parse(&value).map(Actor::Admin)
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.to_string()
    }
}

impl From<AdminId> for Actor {
    fn from(id: AdminId) -> Self {
        Actor::Admin(id)
    }
}

/// A moderatable record.
///
/// `payload` holds kind-specific display data (contact info, pricing, visit
/// dates, denormalized property fields) and is never read by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub state: EntityState,

    /// Partner that owns this record (listings, bookings)
    pub owner_id: Option<EntityId>,
    pub payload: serde_json::Value,

    /// Only meaningful for active partners
    pub suspicion: bool,

    pub submitted_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<Actor>,
}

impl Entity {
    /// Build a freshly submitted, pending entity.
    pub fn submit(kind: EntityKind, owner_id: Option<EntityId>, payload: serde_json::Value) -> Self {
        Self {
            id: EntityId::new(),
            kind,
            state: EntityState::Pending,
            owner_id,
            payload,
            suspicion: false,
            submitted_at: Utc::now(),
            resolved_at: None,
            resolved_by: None,
        }
    }

    pub fn is_partner(&self) -> bool {
        self.kind == EntityKind::Partner
    }

    /// Partners that are pending or approved.
    pub fn is_active_partner(&self) -> bool {
        self.is_partner() && self.state != EntityState::Rejected
    }

    /// Apply a resolution in place. Callers must have checked the transition.
    pub(crate) fn resolve(&mut self, state: EntityState, resolved_by: Actor, at: DateTime<Utc>) {
        self.state = state;
        self.resolved_at = Some(at);
        self.resolved_by = Some(resolved_by);
        if self.is_partner() && state == EntityState::Rejected {
            self.suspicion = false;
        }
    }

    /// Checks the record-level invariants:
    /// resolution fields are present exactly when the entity left pending,
    /// and suspicion is only carried by active partners.
    pub fn invariants_hold(&self) -> bool {
        let resolution_consistent = self.state.is_pending() == self.resolved_at.is_none()
            && self.resolved_at.is_none() == self.resolved_by.is_none();
        let suspicion_consistent = !self.suspicion || self.is_active_partner();
        resolution_consistent && suspicion_consistent
    }
}
