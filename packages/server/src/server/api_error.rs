//! HTTP rendering of engine errors.
//!
//! Every `ModerationError` maps to a stable status and a machine-readable
//! code. Benign outcomes (lost races, repeated commands) carry the current
//! record so the client can refresh in place. Repeated suspicion commands
//! render as 200 no-ops.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error};

use crate::domains::moderation::errors::ModerationError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    benign: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    noop: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    current: Option<Value>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    benign: bool,
    noop: bool,
    current: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            benign: false,
            noop: false,
            current: None,
        }
    }

    /// Command issued without an admin identity
    pub fn admin_required() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "admin_required",
            "this command requires the x-admin-id header",
        )
    }

    fn benign(mut self) -> Self {
        self.benign = true;
        self
    }

    /// The record was already in the requested state
    fn noop(mut self) -> Self {
        self.benign = true;
        self.noop = true;
        self
    }

    fn with_current<T: Serialize>(mut self, current: &T) -> Self {
        self.current = serde_json::to_value(current).ok();
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ModerationError> for ApiError {
    fn from(err: ModerationError) -> Self {
        let message = err.to_string();
        let api_error = match &err {
            ModerationError::NotFound(_) => {
                ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
            }
            ModerationError::Conflict(_) => {
                ApiError::new(StatusCode::CONFLICT, "conflict", message).benign()
            }
            ModerationError::AlreadyResolved(current) => {
                ApiError::new(StatusCode::CONFLICT, "already_resolved", message)
                    .benign()
                    .with_current(current)
            }
            ModerationError::AlreadySuspicious(current) => {
                ApiError::new(StatusCode::OK, "already_suspicious", message)
                    .noop()
                    .with_current(current)
            }
            ModerationError::NotSuspicious(current) => {
                ApiError::new(StatusCode::OK, "not_suspicious", message)
                    .noop()
                    .with_current(current)
            }
            ModerationError::InvalidState(current) => {
                ApiError::new(StatusCode::CONFLICT, "invalid_state", message).with_current(current)
            }
            ModerationError::InvalidMode(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_mode", message)
            }
            ModerationError::InvalidKind { .. } => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "invalid_kind", message)
            }
            ModerationError::InvalidId(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "invalid_id", message)
            }
            ModerationError::UnknownKind(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "unknown_kind", message)
            }
            ModerationError::UnknownState(_) => {
                ApiError::new(StatusCode::BAD_REQUEST, "unknown_state", message)
            }
            ModerationError::UnknownToken => {
                ApiError::new(StatusCode::NOT_FOUND, "unknown_token", message)
            }
            ModerationError::TokenExpired => {
                ApiError::new(StatusCode::GONE, "token_expired", message)
            }
            ModerationError::ModeConflict { current } => {
                ApiError::new(StatusCode::CONFLICT, "mode_conflict", message)
                    .benign()
                    .with_current(current)
            }
            ModerationError::Database(_) | ModerationError::Internal(_) => {
                error!(error = %err, "Request failed");
                return ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "internal server error",
                );
            }
        };

        debug!(code = api_error.code, status = %api_error.status, error = %err, "Command refused");
        api_error
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ModerationError::Internal(err).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = ErrorResponse {
            code: self.code,
            message: self.message,
            benign: self.benign,
            noop: self.noop,
            current: self.current,
        };
        (self.status, Json(payload)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::EntityId;
    use crate::domains::moderation::models::{AutomationFlag, Entity, EntityKind};
    use serde_json::json;

    #[test]
    fn test_lost_race_is_benign_conflict_with_current() {
        let entity = Entity::submit(EntityKind::Booking, None, json!({}));
        let api: ApiError = ModerationError::AlreadyResolved(Box::new(entity.clone())).into();

        assert_eq!(api.status(), StatusCode::CONFLICT);
        assert_eq!(api.code(), "already_resolved");
        assert!(api.benign);
        assert_eq!(api.current, Some(serde_json::to_value(&entity).unwrap()));
    }

    #[test]
    fn test_repeated_suspicion_commands_are_ok_noops() {
        let partner = Entity::submit(EntityKind::Partner, None, json!({}));

        let api: ApiError = ModerationError::AlreadySuspicious(Box::new(partner.clone())).into();
        assert_eq!(api.status(), StatusCode::OK);
        assert_eq!(api.code(), "already_suspicious");
        assert!(api.benign && api.noop);
        assert_eq!(api.current, Some(serde_json::to_value(&partner).unwrap()));

        let api: ApiError = ModerationError::NotSuspicious(Box::new(partner)).into();
        assert_eq!(api.status(), StatusCode::OK);
        assert_eq!(api.code(), "not_suspicious");
        assert!(api.noop);
    }

    #[test]
    fn test_status_table() {
        let cases: Vec<(ModerationError, StatusCode, &str)> = vec![
            (
                ModerationError::NotFound(EntityId::new()),
                StatusCode::NOT_FOUND,
                "not_found",
            ),
            (
                ModerationError::InvalidMode("sometimes".into()),
                StatusCode::BAD_REQUEST,
                "invalid_mode",
            ),
            (
                ModerationError::InvalidKind {
                    id: EntityId::new(),
                    actual: EntityKind::Lead,
                    expected: EntityKind::Partner,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
                "invalid_kind",
            ),
            (
                ModerationError::UnknownToken,
                StatusCode::NOT_FOUND,
                "unknown_token",
            ),
            (ModerationError::TokenExpired, StatusCode::GONE, "token_expired"),
            (
                ModerationError::ModeConflict {
                    current: AutomationFlag::initial(),
                },
                StatusCode::CONFLICT,
                "mode_conflict",
            ),
            (
                ModerationError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal",
            ),
        ];

        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn test_internal_errors_do_not_leak_details() {
        let api: ApiError = ModerationError::Internal(anyhow::anyhow!("password=hunter2")).into();
        assert!(!api.message.contains("hunter2"));
    }
}
