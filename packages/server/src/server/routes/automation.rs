//! Automation flag routes.
//!
//! `Change_toAuto`/`Change_toManual` keep the admin UI's paths but run the
//! request/confirm handshake: a call without a token starts a change (202),
//! a call with one confirms it (200).

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::domains::moderation::actions;
use crate::domains::moderation::automation::ModeChangeOutcome;
use crate::domains::moderation::data::{
    CommandOutcome, ConfirmModeInput, ModeChangeInput, ModeRequestInput,
};
use crate::domains::moderation::models::{AutomationFlag, AutomationMode};
use crate::server::api_error::ApiResult;
use crate::server::app::AppState;
use crate::server::middleware::AdminIdentity;

fn flag_body(flag: &AutomationFlag) -> Value {
    json!({
        "value": flag.mode,
        "version": flag.version,
        "updatedAt": flag.updated_at,
        "updatedBy": flag.updated_by,
    })
}

/// `{ mode, changed, flag }`, plus `noop`/`code` when the mode was already set
fn outcome_body(outcome: CommandOutcome<ModeChangeOutcome>) -> Json<Value> {
    let (result, noop) = match outcome {
        CommandOutcome::Applied(result) => (result, None),
        CommandOutcome::NoOp { current, code } => (current, Some(code)),
    };

    let mut body = json!({
        "mode": result.flag.mode,
        "changed": result.changed,
        "flag": flag_body(&result.flag),
    });
    if let Some(code) = noop {
        body["noop"] = Value::Bool(true);
        body["code"] = json!(code);
    }
    Json(body)
}

/// GET /api/admin/getFlagValue
pub async fn get_flag_value_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Value>> {
    let flag = actions::get_automation_flag(&state.deps).await?;
    Ok(Json(json!({
        "mode": flag.mode,
        "flag": flag_body(&flag),
    })))
}

/// PUT /api/admin/Change_toAuto
pub async fn change_to_auto_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    input: Option<Json<ModeChangeInput>>,
) -> ApiResult<Response> {
    change_mode(state, identity, input, AutomationMode::Auto).await
}

/// PUT /api/admin/Change_toManual
pub async fn change_to_manual_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    input: Option<Json<ModeChangeInput>>,
) -> ApiResult<Response> {
    change_mode(state, identity, input, AutomationMode::Manual).await
}

async fn change_mode(
    state: AppState,
    identity: Option<Extension<AdminIdentity>>,
    input: Option<Json<ModeChangeInput>>,
    mode: AutomationMode,
) -> ApiResult<Response> {
    let admin = AdminIdentity::require(identity)?;
    let token = input.and_then(|Json(input)| input.confirmation_token);

    match token {
        None => {
            let request = actions::request_mode_change(mode.as_str(), admin, &state.deps).await?;
            Ok((StatusCode::ACCEPTED, Json(request)).into_response())
        }
        Some(token) => {
            let outcome = actions::confirm_mode_change(&token, Some(mode), &state.deps).await?;
            Ok(outcome_body(outcome).into_response())
        }
    }
}

/// POST /api/admin/automation/requests
pub async fn request_mode_change_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Json(input): Json<ModeRequestInput>,
) -> ApiResult<Response> {
    let admin = AdminIdentity::require(identity)?;
    let request = actions::request_mode_change(&input.mode, admin, &state.deps).await?;
    Ok((StatusCode::ACCEPTED, Json(request)).into_response())
}

/// POST /api/admin/automation/confirm
pub async fn confirm_mode_change_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Json(input): Json<ConfirmModeInput>,
) -> ApiResult<Json<Value>> {
    AdminIdentity::require(identity)?;
    let outcome = actions::confirm_mode_change(&input.confirmation_token, None, &state.deps).await?;
    Ok(outcome_body(outcome))
}

/// DELETE /api/admin/automation/requests/:token
pub async fn cancel_mode_change_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Path(token): Path<String>,
) -> ApiResult<StatusCode> {
    AdminIdentity::require(identity)?;
    actions::cancel_mode_change(&token, &state.deps).await?;
    Ok(StatusCode::NO_CONTENT)
}
