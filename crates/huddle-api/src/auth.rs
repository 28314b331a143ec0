use std::sync::Arc;

use axum::{Extension, extract::State};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_store::{Store, unix_now};
use huddle_types::api::{
    AuthResponse, LoginRequest, PasswordResetConfirm, PasswordResetRequest, RegisterRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::scheduler::Scheduler;
use crate::validation::{validate_email, validate_names, validate_password};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Store,
    pub scheduler: Scheduler,
    /// Mixed into every token, password and reset digest.
    pub token_secret: String,
    /// Profile image given to every new user.
    pub default_profile_img_url: String,
}

impl AppStateInner {
    pub fn new(token_secret: impl Into<String>, public_url: &str) -> Self {
        Self {
            store: Store::new(),
            scheduler: Scheduler::new(),
            token_secret: token_secret.into(),
            default_profile_img_url: format!(
                "{}/imgurl/default.jpg",
                public_url.trim_end_matches('/')
            ),
        }
    }

    pub fn digest(&self, value: &str) -> String {
        hash_secret(&self.token_secret, value)
    }

    /// Stop every pending timer and start over with an empty workspace.
    pub fn clear(&self) {
        let cancelled = self.scheduler.cancel_all();
        self.store.reset();
        info!(cancelled_jobs = cancelled, "state cleared");
    }
}

/// Hex SHA-256 of `secret`, a NUL separator, then `value`.
///
/// One fixed secret for every user, no per-user salt.
pub fn hash_secret(secret: &str, value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update([0u8]);
    hasher.update(value.as_bytes());
    hex::encode(hasher.finalize())
}

fn new_token() -> String {
    Uuid::new_v4().to_string()
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<AuthResponse>> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_names(&req.name_first, &req.name_last)?;

    let token = new_token();
    let token_hash = state.digest(&token);
    let password_hash = state.digest(&req.password);

    let user_id = state.store.with_state(|ws| {
        if ws.email_taken(&req.email, None) {
            return Err(ApiError::bad_request("email is already in use"));
        }

        let id = ws.insert_user(
            &req.email,
            &password_hash,
            &req.name_first,
            &req.name_last,
            &state.default_profile_img_url,
            unix_now(),
        );
        ws.insert_session(token_hash, id);
        Ok(id)
    })?;

    info!(user_id, "user registered");
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let token = new_token();
    let token_hash = state.digest(&token);
    let password_hash = state.digest(&req.password);

    let user_id = state.store.with_state(|ws| {
        let user = ws
            .user_by_email(&req.email)
            .ok_or_else(|| ApiError::bad_request("email does not belong to a user"))?;
        if user.password_hash != password_hash {
            return Err(ApiError::bad_request("incorrect password"));
        }

        let id = user.id;
        ws.insert_session(token_hash, id);
        Ok(id)
    })?;

    info!(user_id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        auth_user_id: user_id,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Value>> {
    let removed = state
        .store
        .with_state(|ws| ws.remove_session(&auth.token_hash));
    if !removed {
        return Err(ApiError::forbidden("token is not valid"));
    }

    info!(user_id = auth.id, "user logged out");
    Ok(Json(json!({})))
}

/// Always succeeds so callers cannot learn which emails are registered.
pub async fn password_reset_request(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetRequest>,
) -> ApiResult<Json<Value>> {
    let code = Uuid::new_v4().simple().to_string()[..8].to_uppercase();

    let issued = state.store.with_state(|ws| {
        let id = ws.user_by_email(&req.email)?.id;
        let dropped = ws.clear_sessions(id);
        ws.reset_codes.insert(code.clone(), id);
        Some((id, dropped))
    });

    match issued {
        // No mail transport: the code is handed to operators through the log.
        Some((user_id, dropped_sessions)) => {
            info!(user_id, dropped_sessions, "password reset code issued");
            debug!(user_id, reset_code = %code, "password reset code");
        }
        None => warn!("password reset requested for unknown email"),
    }
    Ok(Json(json!({})))
}

pub async fn password_reset_confirm(
    State(state): State<AppState>,
    Json(req): Json<PasswordResetConfirm>,
) -> ApiResult<Json<Value>> {
    validate_password(&req.new_password)?;
    let password_hash = state.digest(&req.new_password);

    let user_id = state.store.with_state(|ws| {
        let id = ws
            .reset_codes
            .remove(&req.reset_code)
            .ok_or_else(|| ApiError::bad_request("reset code is not valid"))?;
        if let Some(user) = ws.user_mut(id) {
            user.password_hash = password_hash;
        }
        Ok::<_, ApiError>(id)
    })?;

    info!(user_id, "password reset");
    Ok(Json(json!({})))
}
