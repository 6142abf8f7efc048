//! Request admission middleware
//!
//! Two layers run in order on every request:
//! 1. [`resolve_identity`] verifies a bearer token, if any, and attaches the
//!    resulting [`Identity`] to the request extensions. It never rejects.
//! 2. [`require_identity`] (the access gate) wraps the protected routes and
//!    answers `401` when no identity was attached.
//!
//! Rejections are the normal response for anonymous traffic, so they are
//! logged at debug level only.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use gallery_lib::{auth::bearer_token, GalleryMetrics, Identity, IdentityVerifier};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Body of the gate's rejection response
#[derive(Debug, Clone, Serialize)]
pub struct Rejection {
    pub message: &'static str,
    pub status: &'static str,
}

impl Rejection {
    pub const UNAUTHORIZED: Rejection = Rejection {
        message: "Unauthorized",
        status: "401",
    };
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, Json(self)).into_response()
    }
}

/// Verifier used by [`resolve_identity`]; `None` leaves every request anonymous
pub type VerifierState = Option<Arc<dyn IdentityVerifier>>;

/// Attach an [`Identity`] for requests carrying a valid bearer token
pub async fn resolve_identity(
    State(verifier): State<VerifierState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(verifier) = verifier else {
        return next.run(request).await;
    };

    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match bearer_token(header) {
        Ok(token) => token.to_owned(),
        Err(reason) => {
            debug!(path = %request.uri().path(), reason = %reason, "No identity resolved");
            return next.run(request).await;
        }
    };

    match verifier.verify(&token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
        }
        Err(reason) => {
            debug!(path = %request.uri().path(), reason = %reason, "Token verification failed");
        }
    }

    next.run(request).await
}

/// Access gate: forward requests with an identity, reject the rest
pub async fn require_identity(
    State(metrics): State<GalleryMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let Some(identity) = request.extensions().get::<Identity>() else {
        debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        metrics.inc_admission_rejections();
        return Rejection::UNAUTHORIZED.into_response();
    };

    info!(
        subject_id = %identity.subject_id,
        path = %request.uri().path(),
        "Admitted request"
    );
    metrics.inc_admitted_requests();

    next.run(request).await
}
