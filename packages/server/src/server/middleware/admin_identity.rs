use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

use crate::common::AdminId;
use crate::server::api_error::ApiError;

/// Header set by the upstream auth gateway once it has authenticated an admin
pub const ADMIN_ID_HEADER: &str = "x-admin-id";

/// Admin issuing the current request
#[derive(Clone, Debug)]
pub struct AdminIdentity(pub AdminId);

impl AdminIdentity {
    /// Unwrap the identity a command handler needs, or 401.
    pub fn require(identity: Option<axum::Extension<AdminIdentity>>) -> Result<AdminId, ApiError> {
        identity
            .map(|axum::Extension(AdminIdentity(id))| id)
            .ok_or_else(ApiError::admin_required)
    }
}

/// Admin identity middleware
///
/// Reads `x-admin-id` and adds `AdminIdentity` to request extensions.
/// A missing or unusable header leaves the request anonymous; command
/// handlers refuse anonymous requests.
pub async fn admin_identity_middleware(mut request: Request, next: Next) -> Response {
    if let Some(identity) = extract_admin_identity(&request) {
        debug!(admin_id = %identity.0, "Admin identified");
        request.extensions_mut().insert(identity);
    }

    next.run(request).await
}

fn extract_admin_identity(request: &Request) -> Option<AdminIdentity> {
    let header = request.headers().get(ADMIN_ID_HEADER)?;
    let value = header.to_str().ok()?;

    match AdminId::parse(value) {
        Ok(id) => Some(AdminIdentity(id)),
        Err(e) => {
            debug!(error = %e, "Ignoring unusable admin id header");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(header: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(ADMIN_ID_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_extracts_trimmed_admin_id() {
        let identity = extract_admin_identity(&request_with(Some(" admin-1 "))).unwrap();
        assert_eq!(identity.0.as_str(), "admin-1");
    }

    #[test]
    fn test_missing_header_is_anonymous() {
        assert!(extract_admin_identity(&request_with(None)).is_none());
    }

    #[test]
    fn test_reserved_system_id_is_not_an_admin() {
        assert!(extract_admin_identity(&request_with(Some("system"))).is_none());
        assert!(extract_admin_identity(&request_with(Some(""))).is_none());
    }

    #[test]
    fn test_require_without_identity_is_admin_required() {
        let err = AdminIdentity::require(None).unwrap_err();
        assert_eq!(err.code(), "admin_required");
    }
}
