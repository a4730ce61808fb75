//! User registration.
//!
//! Creating an account sends the verification email. Checking the code is
//! left to the fronting authentication layer.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::Json, routing::post, Router};
use rand::Rng;

use crate::store::StoreError;

use super::routes::AppState;
use super::types::{DispatchStatus, RegisterRequest, RegisterResponse};

/// Create the user API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", post(register))
}

/// Four-digit code shown in the verification email.
fn generate_verification_code() -> String {
    format!("{:04}", rand::thread_rng().gen_range(0..10_000))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), (StatusCode, String)> {
    let email = req.email.trim();
    let username = req.username.trim();
    if email.is_empty() || username.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and username are required".to_string(),
        ));
    }

    let user = match state.storage.insert_user(email, username).await {
        Ok(user) => user,
        Err(StoreError::DuplicateEmail(email)) => {
            return Err((
                StatusCode::CONFLICT,
                format!("Email already registered: {}", email),
            ))
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };
    tracing::info!("Registered user {} ({})", user.username, user.email);

    let code = generate_verification_code();
    let outcome = state
        .dispatcher
        .send_verification(&user.email, &code, &user.username)
        .await;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            verification: DispatchStatus::of(&outcome),
        }),
    ))
}
