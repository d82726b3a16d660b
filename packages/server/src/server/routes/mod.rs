// HTTP routes
pub mod automation;
pub mod health;
pub mod moderation;
pub mod partners;

pub use automation::*;
pub use health::*;
pub use moderation::*;
pub use partners::*;

use axum::Json;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::domains::moderation::data::CommandOutcome;
use crate::server::api_error::{ApiError, ApiResult};

/// Render a command result under `key`; no-ops also get `noop: true` and a code.
pub(crate) fn command_body<T: Serialize>(
    key: &str,
    outcome: CommandOutcome<T>,
) -> ApiResult<Json<Value>> {
    let (value, noop) = match outcome {
        CommandOutcome::Applied(value) => (value, None),
        CommandOutcome::NoOp { current, code } => (current, Some(code)),
    };

    let mut body = Map::new();
    body.insert(key.to_string(), to_json(&value)?);
    if let Some(code) = noop {
        body.insert("noop".to_string(), Value::Bool(true));
        body.insert("code".to_string(), to_json(&code)?);
    }
    Ok(Json(Value::Object(body)))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::from(anyhow::Error::from(e)))
}
