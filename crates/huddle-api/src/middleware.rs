use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use huddle_types::models::UserId;

use crate::auth::AppState;
use crate::error::ApiError;

/// Header carrying the session token on every authenticated request.
pub const TOKEN_HEADER: &str = "token";

/// The caller, as resolved from their session token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: UserId,
    pub token_hash: String,
}

/// Resolve the `token` header to a live session and attach [`AuthUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::forbidden("missing token"))?;

    let token_hash = state.digest(token);
    let id = state
        .store
        .with_state(|ws| ws.resolve_session(&token_hash))
        .ok_or_else(|| ApiError::forbidden("token is not valid"))?;

    req.extensions_mut().insert(AuthUser { id, token_hash });
    Ok(next.run(req).await)
}
