//! Principal extraction.

use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the authenticated principal's email.
pub const PRINCIPAL_HEADER: &str = "x-principal-email";

/// The authenticated caller, inserted as a request extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// Read the principal email from request headers, if present and non-empty.
pub fn principal_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(PRINCIPAL_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
}

/// Reject requests without a principal; otherwise attach a [`Principal`].
pub async fn require_principal(mut req: Request<Body>, next: Next) -> Response {
    match principal_from_headers(req.headers()) {
        Some(email) => {
            req.extensions_mut().insert(Principal { email });
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "Missing X-Principal-Email header").into_response(),
    }
}
