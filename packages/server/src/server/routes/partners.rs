//! Partner views and the suspicious flag.

use axum::{extract::Extension, Json};
use serde_json::{json, Value};

use crate::domains::moderation::actions;
use crate::domains::moderation::data::PartnerIdInput;
use crate::server::api_error::ApiResult;
use crate::server::app::AppState;
use crate::server::middleware::AdminIdentity;
use crate::server::routes::command_body;

/// GET /api/admin/getAllpartner
///
/// The "normal" view: active partners that are not flagged.
pub async fn normal_partners_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Value>> {
    let partners = actions::get_normal_partners(&state.deps).await?;
    Ok(Json(json!({ "partners": partners })))
}

/// GET /api/admin/suspicious
pub async fn suspicious_partners_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Value>> {
    let partners = actions::get_suspicious_partners(&state.deps).await?;
    Ok(Json(json!({ "partners": partners })))
}

/// POST /api/admin/markSuspicious
pub async fn mark_suspicious_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Json(input): Json<PartnerIdInput>,
) -> ApiResult<Json<Value>> {
    let admin = AdminIdentity::require(identity)?;
    let outcome = actions::mark_partner_suspicious(&input.partner_id, admin, &state.deps).await?;
    command_body("partner", outcome)
}

/// POST /api/admin/removeSuspicious
pub async fn remove_suspicious_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Json(input): Json<PartnerIdInput>,
) -> ApiResult<Json<Value>> {
    let admin = AdminIdentity::require(identity)?;
    let outcome =
        actions::unmark_partner_suspicious(&input.partner_id, admin, &state.deps).await?;
    command_body("partner", outcome)
}
