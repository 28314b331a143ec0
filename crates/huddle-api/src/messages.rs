use std::time::Duration;

use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::{info, warn};

use huddle_store::models::MessageRecord;
use huddle_store::{Target, Workspace, unix_now};
use huddle_types::api::{
    EditMessageRequest, MessageIdResponse, MessageRef, SendDmRequest, SendLaterDmRequest,
    SendLaterRequest, SendMessageRequest, ShareMessageRequest, ShareMessageResponse,
};
use huddle_types::models::{MessageId, UserId};

use crate::auth::AppState;
use crate::channels::require_channel_member;
use crate::dms::require_dm_member;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::middleware::AuthUser;
use crate::notifications::notify_tagged;
use crate::scheduler::JobKey;
use crate::validation::{validate_message, validate_optional_message};

/// 400 if `target` is unknown, 403 if `user` is not in it.
pub(crate) fn require_member(ws: &Workspace, user: UserId, target: Target) -> ApiResult<()> {
    match target {
        Target::Channel(id) => require_channel_member(ws, user, id),
        Target::Dm(id) => require_dm_member(ws, user, id),
    }
}

/// Append `message` to `target` and do the bookkeeping every new message
/// needs: author and workspace stats, and notifications for members tagged
/// in `tag_source`. Returns `false` if `target` is gone.
pub(crate) fn deliver(
    ws: &mut Workspace,
    target: Target,
    message: MessageRecord,
    tag_source: &str,
) -> bool {
    let author = message.author;
    let now = message.time_sent;
    if !ws.insert_message(target, message) {
        return false;
    }
    ws.record_message_sent(author, now);
    ws.record_workspace(now);
    notify_tagged(ws, target, author, tag_source);
    true
}

/// Locate a message the caller can see and may modify.
fn require_modifiable(ws: &Workspace, user: UserId, message_id: MessageId) -> ApiResult<Target> {
    let target = ws
        .visible_message(user, message_id)
        .ok_or_else(|| ApiError::bad_request(format!("message {message_id} does not exist")))?;
    let author = ws.message(message_id).map(|m| m.author);
    if author != Some(user) && !ws.has_owner_perms(user, target) {
        return Err(ApiError::forbidden("not the author and no owner permissions"));
    }
    Ok(target)
}

fn send_now(state: &AppState, user: UserId, target: Target, text: String) -> ApiResult<MessageId> {
    validate_message(&text)?;
    state.store.with_state(|ws| {
        require_member(ws, user, target)?;
        let id = ws.reserve_message_id();
        let record = MessageRecord::new(id, user, text.clone(), unix_now());
        deliver(ws, target, record, &text);
        Ok(id)
    })
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let message_id = send_now(&state, auth.id, Target::Channel(req.channel_id), req.message)?;
    info!(message_id, channel_id = req.channel_id, author = auth.id, "message sent");
    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn send_dm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendDmRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let message_id = send_now(&state, auth.id, Target::Dm(req.dm_id), req.message)?;
    info!(message_id, dm_id = req.dm_id, author = auth.id, "dm message sent");
    Ok(Json(MessageIdResponse { message_id }))
}

/// Empty text removes the message.
pub async fn edit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<EditMessageRequest>,
) -> ApiResult<Json<Value>> {
    validate_optional_message(&req.message)?;

    state.store.with_state(|ws| {
        let target = require_modifiable(ws, auth.id, req.message_id)?;
        if req.message.is_empty() {
            ws.remove_message(req.message_id);
            ws.record_workspace(unix_now());
            return Ok::<_, ApiError>(());
        }

        if let Some(message) = ws.message_mut(req.message_id) {
            message.text = req.message.clone();
        }
        notify_tagged(ws, target, auth.id, &req.message);
        Ok(())
    })?;

    info!(message_id = req.message_id, by = auth.id, "message edited");
    Ok(Json(json!({})))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<MessageRef>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        require_modifiable(ws, auth.id, query.message_id)?;
        ws.remove_message(query.message_id);
        ws.record_workspace(unix_now());
        Ok::<_, ApiError>(())
    })?;

    info!(message_id = query.message_id, by = auth.id, "message removed");
    Ok(Json(json!({})))
}

fn share_target(channel_id: i64, dm_id: i64) -> ApiResult<Target> {
    let id = |raw: i64| {
        u32::try_from(raw).map_err(|_| ApiError::bad_request(format!("{raw} is not a valid id")))
    };
    match (channel_id, dm_id) {
        (-1, dm) if dm != -1 => Ok(Target::Dm(id(dm)?)),
        (channel, -1) if channel != -1 => Ok(Target::Channel(id(channel)?)),
        _ => Err(ApiError::bad_request(
            "exactly one of channelId and dmId must be -1",
        )),
    }
}

pub async fn share(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ShareMessageRequest>,
) -> ApiResult<Json<ShareMessageResponse>> {
    let target = share_target(req.channel_id, req.dm_id)?;
    validate_optional_message(&req.message)?;

    let shared_message_id = state.store.with_state(|ws| {
        if !ws.target_exists(target) {
            return Err(ApiError::bad_request("destination does not exist"));
        }
        let original = ws
            .visible_message(auth.id, req.og_message_id)
            .and_then(|_| ws.message(req.og_message_id))
            .map(|m| m.text.clone())
            .ok_or_else(|| ApiError::bad_request("original message does not exist"))?;
        require_member(ws, auth.id, target)?;

        let text = if req.message.is_empty() {
            original
        } else {
            format!("{original}\n{}", req.message)
        };
        let id = ws.reserve_message_id();
        let record = MessageRecord::new(id, auth.id, text, unix_now());
        deliver(ws, target, record, &req.message);
        Ok(id)
    })?;

    info!(
        shared_message_id,
        og_message_id = req.og_message_id,
        by = auth.id,
        "message shared"
    );
    Ok(Json(ShareMessageResponse { shared_message_id }))
}

/// Reserve an id now and insert the message at `time_sent`.
fn send_later(
    state: &AppState,
    user: UserId,
    target: Target,
    text: String,
    time_sent: i64,
) -> ApiResult<MessageId> {
    validate_message(&text)?;
    let now = unix_now();
    if time_sent < now {
        return Err(ApiError::bad_request("timeSent is in the past"));
    }

    let id = state.store.with_state(|ws| {
        require_member(ws, user, target)?;
        Ok::<_, ApiError>(ws.reserve_message_id())
    })?;

    let key = JobKey::Send(id);
    let delay = Duration::from_secs(time_sent.abs_diff(now));
    let task_state = state.clone();
    state.scheduler.schedule(key, target, delay, async move {
        if !task_state.scheduler.finish(key) {
            return;
        }
        let record = MessageRecord::new(id, user, text.clone(), time_sent);
        let outcome = task_state.store.with_state(|ws| {
            if ws.active_user(user).is_none() {
                Err("author was removed")
            } else if !ws.target_is_live(target) {
                Err("destination gone")
            } else {
                Ok(deliver(ws, target, record, &text))
            }
        });
        match outcome {
            Ok(true) => info!(message_id = id, ?target, "scheduled message sent"),
            Ok(false) => warn!(message_id = id, ?target, "scheduled message dropped, destination gone"),
            Err(reason) => warn!(message_id = id, ?target, reason, "scheduled message dropped"),
        }
    });

    Ok(id)
}

pub async fn send_later_channel(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendLaterRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let target = Target::Channel(req.channel_id);
    let message_id = send_later(&state, auth.id, target, req.message, req.time_sent)?;
    info!(message_id, channel_id = req.channel_id, time_sent = req.time_sent, "message scheduled");
    Ok(Json(MessageIdResponse { message_id }))
}

pub async fn send_later_dm(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendLaterDmRequest>,
) -> ApiResult<Json<MessageIdResponse>> {
    let target = Target::Dm(req.dm_id);
    let message_id = send_later(&state, auth.id, target, req.message, req.time_sent)?;
    info!(message_id, dm_id = req.dm_id, time_sent = req.time_sent, "dm message scheduled");
    Ok(Json(MessageIdResponse { message_id }))
}
