//! Approval queue routes: submissions, bookings, leads and generic resolution.

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::domains::moderation::actions;
use crate::domains::moderation::data::{LeadIdInput, PendingCounts, QueueQuery, SubmitEntityInput};
use crate::domains::moderation::models::Decision;
use crate::server::api_error::ApiResult;
use crate::server::app::AppState;
use crate::server::middleware::AdminIdentity;
use crate::server::routes::command_body;

/// POST /api/moderation/entities
pub async fn submit_entity_handler(
    Extension(state): Extension<AppState>,
    Json(input): Json<SubmitEntityInput>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let entity = actions::submit_entity(input, &state.deps).await?;
    Ok((StatusCode::CREATED, Json(json!({ "entity": entity }))))
}

/// GET /api/moderation/entities/:id
pub async fn get_entity_handler(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let entity = actions::get_entity(&id, &state.deps).await?;
    Ok(Json(json!({ "entity": entity })))
}

/// GET /api/moderation/queue?kind=&state=
pub async fn queue_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<QueueQuery>,
) -> ApiResult<Json<Value>> {
    let entities = actions::list_queue(query, &state.deps).await?;
    Ok(Json(json!({ "entities": entities })))
}

/// POST /api/moderation/entities/:id/approve
pub async fn approve_entity_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    resolve(state, identity, id, Decision::Approve).await
}

/// POST /api/moderation/entities/:id/reject
pub async fn reject_entity_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    resolve(state, identity, id, Decision::Reject).await
}

async fn resolve(
    state: AppState,
    identity: Option<Extension<AdminIdentity>>,
    id: String,
    decision: Decision,
) -> ApiResult<Json<Value>> {
    let admin = AdminIdentity::require(identity)?;
    let outcome = actions::resolve_entity(&id, decision, admin, &state.deps).await?;
    command_body("entity", outcome)
}

/// GET /api/user/getBookingforApproval
pub async fn bookings_for_approval_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<Value>> {
    let bookings = actions::get_bookings_for_approval(&state.deps).await?;
    Ok(Json(json!({ "booking": bookings })))
}

/// POST /api/refer/setCustomerleadtoApproval
pub async fn approve_lead_handler(
    Extension(state): Extension<AppState>,
    identity: Option<Extension<AdminIdentity>>,
    Json(input): Json<LeadIdInput>,
) -> ApiResult<Json<Value>> {
    let admin = AdminIdentity::require(identity)?;
    let outcome = actions::approve_lead(&input.id, admin, &state.deps).await?;
    command_body("lead", outcome)
}

/// GET /api/admin/pendingCounts
pub async fn pending_counts_handler(
    Extension(state): Extension<AppState>,
) -> ApiResult<Json<PendingCounts>> {
    Ok(Json(actions::get_pending_counts(&state.deps).await?))
}
