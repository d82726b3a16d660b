use thiserror::Error;

use crate::common::{EntityId, IdError};
use crate::domains::moderation::models::{AutomationFlag, Entity, EntityKind};

/// Typed outcomes of every engine operation.
///
/// Variants that carry an entity or flag carry the *current* record so the
/// caller can refresh without another round trip.
#[derive(Error, Debug)]
pub enum ModerationError {
    #[error("entity {0} not found")]
    NotFound(EntityId),

    /// Lost a compare-and-swap against a concurrent writer
    #[error("entity {0} was modified concurrently")]
    Conflict(EntityId),

    #[error("entity {} was already resolved as {}", .0.id, .0.state)]
    AlreadyResolved(Box<Entity>),

    #[error("partner {} is already marked suspicious", .0.id)]
    AlreadySuspicious(Box<Entity>),

    #[error("partner {} is not marked suspicious", .0.id)]
    NotSuspicious(Box<Entity>),

    #[error("entity {} is {} and cannot take this transition", .0.id, .0.state)]
    InvalidState(Box<Entity>),

    #[error("invalid automation mode: {0:?}")]
    InvalidMode(String),

    #[error("entity {id} is a {actual}, expected a {expected}")]
    InvalidKind {
        id: EntityId,
        actual: EntityKind,
        expected: EntityKind,
    },

    #[error(transparent)]
    InvalidId(#[from] IdError),

    #[error("unknown entity kind: {0:?}")]
    UnknownKind(String),

    #[error("unknown entity state: {0:?}")]
    UnknownState(String),

    #[error("unknown or already used confirmation token")]
    UnknownToken,

    #[error("confirmation token expired")]
    TokenExpired,

    #[error("automation flag changed since the request was made (now {} at version {})", .current.mode, .current.version)]
    ModeConflict { current: AutomationFlag },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ModerationError {
    /// Outcomes a caller should treat as "refresh and show current state"
    /// rather than as a hard failure.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            ModerationError::Conflict(_)
                | ModerationError::AlreadyResolved(_)
                | ModerationError::AlreadySuspicious(_)
                | ModerationError::NotSuspicious(_)
                | ModerationError::ModeConflict { .. }
        )
    }

    /// The current record attached to this outcome, if any.
    pub fn current_entity(&self) -> Option<&Entity> {
        match self {
            ModerationError::AlreadyResolved(entity)
            | ModerationError::AlreadySuspicious(entity)
            | ModerationError::NotSuspicious(entity)
            | ModerationError::InvalidState(entity) => Some(entity),
            _ => None,
        }
    }
}

pub type ModerationResult<T> = Result<T, ModerationError>;
