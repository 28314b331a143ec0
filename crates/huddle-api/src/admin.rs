use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::{info, warn};

use huddle_store::{Permission, Workspace, unix_now};
use huddle_types::api::{PermissionChangeRequest, UserRef};
use huddle_types::models::UserId;

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::middleware::AuthUser;

/// Text that replaces every message written by a removed user.
pub const REMOVED_TEXT: &str = "Removed user";

fn require_active_user(ws: &Workspace, user: UserId) -> ApiResult<()> {
    if ws.active_user(user).is_none() {
        return Err(ApiError::bad_request(format!("user {user} does not exist")));
    }
    Ok(())
}

fn is_sole_owner(ws: &Workspace, user: UserId) -> bool {
    ws.is_global_owner(user) && ws.global_owner_count() == 1
}

fn require_global_owner(ws: &Workspace, user: UserId) -> ApiResult<()> {
    if !ws.is_global_owner(user) {
        return Err(ApiError::forbidden("global owner permissions required"));
    }
    Ok(())
}

/// Strip `user` out of every channel and DM and redact what they wrote.
/// The record stays so old messages and ids still resolve.
pub(crate) fn scrub_user(ws: &mut Workspace, user: UserId) {
    for channel in ws.channels.values_mut() {
        channel.members.retain(|&m| m != user);
        channel.owners.retain(|&m| m != user);
        for message in channel.messages.iter_mut().filter(|m| m.author == user) {
            message.text = REMOVED_TEXT.to_string();
        }
    }
    for dm in ws.dms.values_mut() {
        dm.members.retain(|&m| m != user);
        for message in dm.messages.iter_mut().filter(|m| m.author == user) {
            message.text = REMOVED_TEXT.to_string();
        }
    }

    if let Some(record) = ws.user_mut(user) {
        record.name_first = "Removed".to_string();
        record.name_last = "user".to_string();
        record.email.clear();
        record.handle.clear();
        record.removed = true;
    }
}

pub async fn remove_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<UserRef>,
) -> ApiResult<Json<Value>> {
    let sessions = state.store.with_state(|ws| {
        require_active_user(ws, query.u_id)?;
        if is_sole_owner(ws, query.u_id) {
            return Err(ApiError::bad_request("cannot remove the only global owner"));
        }
        require_global_owner(ws, auth.id)?;

        scrub_user(ws, query.u_id);
        let now = unix_now();
        ws.record_memberships(query.u_id, now);
        ws.record_workspace(now);
        Ok(ws.clear_sessions(query.u_id))
    })?;

    warn!(user_id = query.u_id, by = auth.id, sessions, "user removed");
    Ok(Json(json!({})))
}

pub async fn change_permission(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<PermissionChangeRequest>,
) -> ApiResult<Json<Value>> {
    let permission = state.store.with_state(|ws| {
        require_active_user(ws, req.u_id)?;
        let permission = Permission::from_id(req.permission_id).ok_or_else(|| {
            ApiError::bad_request(format!("{} is not a valid permission id", req.permission_id))
        })?;
        let current = ws.user(req.u_id).map(|u| u.permission);
        if current == Some(permission) {
            return Err(ApiError::bad_request("user already has this permission"));
        }
        if permission == Permission::Member && is_sole_owner(ws, req.u_id) {
            return Err(ApiError::bad_request("cannot demote the only global owner"));
        }
        require_global_owner(ws, auth.id)?;

        if let Some(user) = ws.user_mut(req.u_id) {
            user.permission = permission;
        }
        Ok(permission)
    })?;

    info!(user_id = req.u_id, ?permission, by = auth.id, "permission changed");
    Ok(Json(json!({})))
}
