use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::info;

use huddle_types::api::{
    SetEmailRequest, SetHandleRequest, SetNameRequest, UserProfileResponse, UserRef,
    UserStatsResponse, UsersAllResponse, WorkspaceStatsResponse,
};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::middleware::AuthUser;
use crate::validation::{validate_email, validate_handle, validate_names};

/// Removed users still resolve here, with their redacted profile.
pub async fn profile(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
    Query(query): Query<UserRef>,
) -> ApiResult<Json<UserProfileResponse>> {
    state.store.with_state(|ws| {
        let user = ws
            .user(query.u_id)
            .ok_or_else(|| ApiError::bad_request(format!("user {} does not exist", query.u_id)))?;
        Ok(Json(UserProfileResponse {
            user: user.profile(),
        }))
    })
}

pub async fn all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<UsersAllResponse>> {
    let users = state
        .store
        .with_state(|ws| ws.active_users().map(|u| u.profile()).collect());
    Ok(Json(UsersAllResponse { users }))
}

pub async fn set_name(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetNameRequest>,
) -> ApiResult<Json<Value>> {
    validate_names(&req.name_first, &req.name_last)?;

    state.store.with_state(|ws| {
        if let Some(user) = ws.user_mut(auth.id) {
            user.name_first = req.name_first;
            user.name_last = req.name_last;
        }
    });

    info!(user_id = auth.id, "name updated");
    Ok(Json(json!({})))
}

pub async fn set_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetEmailRequest>,
) -> ApiResult<Json<Value>> {
    validate_email(&req.email)?;

    state.store.with_state(|ws| {
        if ws.email_taken(&req.email, Some(auth.id)) {
            return Err(ApiError::bad_request("email is already in use"));
        }
        if let Some(user) = ws.user_mut(auth.id) {
            user.email = req.email;
        }
        Ok(())
    })?;

    info!(user_id = auth.id, "email updated");
    Ok(Json(json!({})))
}

pub async fn set_handle(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SetHandleRequest>,
) -> ApiResult<Json<Value>> {
    validate_handle(&req.handle_str)?;

    state.store.with_state(|ws| {
        if ws.handle_taken(&req.handle_str, Some(auth.id)) {
            return Err(ApiError::bad_request("handle is already in use"));
        }
        if let Some(user) = ws.user_mut(auth.id) {
            user.handle = req.handle_str.clone();
        }
        Ok(())
    })?;

    info!(user_id = auth.id, handle = %req.handle_str, "handle updated");
    Ok(Json(json!({})))
}

pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<UserStatsResponse>> {
    let user_stats = state
        .store
        .with_state(|ws| ws.user_stats(auth.id))
        .ok_or_else(|| ApiError::forbidden("user no longer exists"))?;
    Ok(Json(UserStatsResponse { user_stats }))
}

pub async fn workspace_stats(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<WorkspaceStatsResponse>> {
    let workspace_stats = state.store.with_state(|ws| ws.workspace_stats());
    Ok(Json(WorkspaceStatsResponse { workspace_stats }))
}
