//! Application setup and server configuration.

use axum::{
    extract::Extension,
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::kernel::ServerDeps;
use crate::server::middleware::{admin_identity_middleware, ADMIN_ID_HEADER};
use crate::server::routes::{
    approve_entity_handler, approve_lead_handler, bookings_for_approval_handler,
    cancel_mode_change_handler, change_to_auto_handler, change_to_manual_handler,
    confirm_mode_change_handler, get_entity_handler, get_flag_value_handler, health_handler,
    mark_suspicious_handler, normal_partners_handler, pending_counts_handler, queue_handler,
    reject_entity_handler, remove_suspicious_handler, request_mode_change_handler,
    submit_entity_handler, suspicious_partners_handler,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub deps: ServerDeps,
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    // No configured origins means development: allow any
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(ADMIN_ID_HEADER)])
}

/// Build the Axum application router
pub fn build_app(deps: ServerDeps, allowed_origins: &[String]) -> Router {
    let app_state = AppState { deps };

    Router::new()
        // Generic moderation engine
        .route("/api/moderation/entities", post(submit_entity_handler))
        .route("/api/moderation/entities/:id", get(get_entity_handler))
        .route(
            "/api/moderation/entities/:id/approve",
            post(approve_entity_handler),
        )
        .route(
            "/api/moderation/entities/:id/reject",
            post(reject_entity_handler),
        )
        .route("/api/moderation/queue", get(queue_handler))
        // Admin UI paths
        .route(
            "/api/user/getBookingforApproval",
            get(bookings_for_approval_handler),
        )
        .route(
            "/api/refer/setCustomerleadtoApproval",
            post(approve_lead_handler),
        )
        .route("/api/admin/getAllpartner", get(normal_partners_handler))
        .route("/api/admin/suspicious", get(suspicious_partners_handler))
        .route("/api/admin/markSuspicious", post(mark_suspicious_handler))
        .route("/api/admin/removeSuspicious", post(remove_suspicious_handler))
        .route("/api/admin/pendingCounts", get(pending_counts_handler))
        // Automation flag
        .route("/api/admin/getFlagValue", get(get_flag_value_handler))
        .route("/api/admin/Change_toAuto", put(change_to_auto_handler))
        .route("/api/admin/Change_toManual", put(change_to_manual_handler))
        .route(
            "/api/admin/automation/requests",
            post(request_mode_change_handler),
        )
        .route(
            "/api/admin/automation/requests/:token",
            delete(cancel_mode_change_handler),
        )
        .route(
            "/api/admin/automation/confirm",
            post(confirm_mode_change_handler),
        )
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(admin_identity_middleware))
        .layer(Extension(app_state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}
