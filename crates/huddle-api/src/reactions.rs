use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::info;

use huddle_store::models::ReactRecord;
use huddle_store::{Target, Workspace};
use huddle_types::api::{MessageRef, ReactRequest};
use huddle_types::models::{MessageId, UserId};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::Json;
use crate::middleware::AuthUser;
use crate::notifications::notify_reacted;

/// The only reaction the workspace knows about.
pub const THUMBS_UP: u32 = 1;

fn require_visible(ws: &Workspace, user: UserId, message_id: MessageId) -> ApiResult<Target> {
    ws.visible_message(user, message_id)
        .ok_or_else(|| ApiError::bad_request(format!("message {message_id} does not exist")))
}

fn require_react_id(react_id: u32) -> ApiResult<()> {
    if react_id != THUMBS_UP {
        return Err(ApiError::bad_request(format!("{react_id} is not a valid react id")));
    }
    Ok(())
}

pub async fn react(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ReactRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        let target = require_visible(ws, auth.id, req.message_id)?;
        require_react_id(req.react_id)?;

        let message = ws
            .message_mut(req.message_id)
            .ok_or_else(|| ApiError::bad_request("message does not exist"))?;
        match message.reacts.iter_mut().find(|r| r.react_id == req.react_id) {
            Some(existing) if existing.users.contains(&auth.id) => {
                return Err(ApiError::bad_request("already reacted with this react id"));
            }
            Some(existing) => existing.users.push(auth.id),
            None => message.reacts.push(ReactRecord {
                react_id: req.react_id,
                users: vec![auth.id],
            }),
        }
        let author = message.author;

        notify_reacted(ws, target, auth.id, author);
        Ok(())
    })?;

    info!(message_id = req.message_id, react_id = req.react_id, by = auth.id, "reaction added");
    Ok(Json(json!({})))
}

pub async fn unreact(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ReactRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        require_visible(ws, auth.id, req.message_id)?;
        require_react_id(req.react_id)?;

        let message = ws
            .message_mut(req.message_id)
            .ok_or_else(|| ApiError::bad_request("message does not exist"))?;
        let react = message
            .reacts
            .iter_mut()
            .find(|r| r.react_id == req.react_id && r.users.contains(&auth.id))
            .ok_or_else(|| ApiError::bad_request("no reaction with this react id to remove"))?;
        react.users.retain(|&u| u != auth.id);
        message.reacts.retain(|r| !r.users.is_empty());
        Ok::<_, ApiError>(())
    })?;

    info!(message_id = req.message_id, react_id = req.react_id, by = auth.id, "reaction removed");
    Ok(Json(json!({})))
}

fn set_pinned(state: &AppState, user: UserId, message_id: MessageId, pinned: bool) -> ApiResult<()> {
    state.store.with_state(|ws| {
        let target = require_visible(ws, user, message_id)?;
        let is_pinned = ws.message(message_id).is_some_and(|m| m.is_pinned);
        if is_pinned == pinned {
            let current = if pinned { "pinned" } else { "not pinned" };
            return Err(ApiError::bad_request(format!("message is already {current}")));
        }
        if !ws.has_owner_perms(user, target) {
            return Err(ApiError::forbidden("owner permissions required"));
        }

        if let Some(message) = ws.message_mut(message_id) {
            message.is_pinned = pinned;
        }
        Ok(())
    })
}

pub async fn pin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageRef>,
) -> ApiResult<Json<Value>> {
    set_pinned(&state, auth.id, req.message_id, true)?;
    info!(message_id = req.message_id, by = auth.id, "message pinned");
    Ok(Json(json!({})))
}

pub async fn unpin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<MessageRef>,
) -> ApiResult<Json<Value>> {
    set_pinned(&state, auth.id, req.message_id, false)?;
    info!(message_id = req.message_id, by = auth.id, "message unpinned");
    Ok(Json(json!({})))
}
