//! Identifiers used by the moderation engine.
//!
//! Entity ids are UUID v7 so that insertion order and id order agree, which
//! keeps FIFO tie-breaking stable across stores. Admin ids are opaque strings
//! handed to us by the upstream auth gateway.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Errors produced when parsing identifiers from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("invalid id: {0}")]
    InvalidUuid(String),

    #[error("admin id must not be empty")]
    EmptyAdminId,

    #[error("\"{0}\" is reserved and cannot be used as an admin id")]
    ReservedAdminId(String),
}

// ============================================================================
// EntityId
// ============================================================================

/// Id of a moderatable entity (booking, listing, lead or partner).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, sqlx::Type,
)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new time-ordered id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdError::InvalidUuid(s.to_string()))
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for EntityId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// AdminId
// ============================================================================

/// The literal used to mark system (automation) resolutions.
pub const SYSTEM_ACTOR: &str = "system";

/// Id of the admin who issued a command.
///
/// Never empty and never equal to [`SYSTEM_ACTOR`], so an admin can't be
/// confused with the automation controller in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AdminId(String);

impl AdminId {
    pub fn parse(s: &str) -> Result<Self, IdError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(IdError::EmptyAdminId);
        }
        if trimmed.eq_ignore_ascii_case(SYSTEM_ACTOR) {
            return Err(IdError::ReservedAdminId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AdminId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AdminId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AdminId> for String {
    fn from(id: AdminId) -> Self {
        id.0
    }
}

// ============================================================================
// ModeChangeToken
// ============================================================================

/// Single-use token returned by a mode change request and redeemed on confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModeChangeToken(Uuid);

impl ModeChangeToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| IdError::InvalidUuid(s.to_string()))
    }
}

impl Default for ModeChangeToken {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ModeChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}
