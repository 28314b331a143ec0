use std::time::Duration;

use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::info;

use huddle_store::models::{MessageRecord, Standup};
use huddle_store::{Target, Workspace, unix_now};
use huddle_types::api::{
    ChannelRef, SendMessageRequest, StandupActiveResponse, StandupStartRequest,
    StandupStartResponse,
};
use huddle_types::models::{ChannelId, MessageId};

use crate::auth::AppState;
use crate::channels::require_channel_member;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::messages::deliver;
use crate::middleware::AuthUser;
use crate::scheduler::JobKey;
use crate::validation::validate_optional_message;

fn require_channel(ws: &Workspace, channel: ChannelId) -> ApiResult<()> {
    if ws.channel(channel).is_none() {
        return Err(ApiError::bad_request(format!("channel {channel} does not exist")));
    }
    Ok(())
}

fn is_active(ws: &Workspace, channel: ChannelId) -> bool {
    ws.channel(channel).is_some_and(|c| c.standup.is_some())
}

/// Close the channel's standup and post its buffered lines as one message
/// from the starter. Nothing is posted for an empty standup.
pub(crate) fn finish_standup(ws: &mut Workspace, channel: ChannelId) -> Option<MessageId> {
    let standup = ws.channel_mut(channel)?.standup.take()?;
    if standup.lines.is_empty() {
        return None;
    }

    let id = ws.reserve_message_id();
    let record = MessageRecord::new(
        id,
        standup.starter,
        standup.lines.join("\n"),
        standup.time_finish,
    );
    deliver(ws, Target::Channel(channel), record, "").then_some(id)
}

pub async fn start(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<StandupStartRequest>,
) -> ApiResult<Json<StandupStartResponse>> {
    let channel_id = req.channel_id;
    let time_finish = state.store.with_state(|ws| {
        require_channel(ws, channel_id)?;
        if req.length < 0 {
            return Err(ApiError::bad_request("length cannot be negative"));
        }
        if is_active(ws, channel_id) {
            return Err(ApiError::bad_request("a standup is already running"));
        }
        require_channel_member(ws, auth.id, channel_id)?;

        let time_finish = unix_now()
            .checked_add(req.length)
            .ok_or_else(|| ApiError::bad_request("length is too large"))?;
        if let Some(channel) = ws.channel_mut(channel_id) {
            channel.standup = Some(Standup {
                starter: auth.id,
                time_finish,
                lines: vec![],
            });
        }
        Ok(time_finish)
    })?;

    let key = JobKey::StandupFinish(channel_id);
    let task_state = state.clone();
    state.scheduler.schedule(
        key,
        Target::Channel(channel_id),
        Duration::from_secs(req.length.unsigned_abs()),
        async move {
            if !task_state.scheduler.finish(key) {
                return;
            }
            let posted = task_state
                .store
                .with_state(|ws| finish_standup(ws, channel_id));
            info!(channel_id, summary_message = ?posted, "standup finished");
        },
    );

    info!(channel_id, starter = auth.id, time_finish, "standup started");
    Ok(Json(StandupStartResponse { time_finish }))
}

pub async fn active(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelRef>,
) -> ApiResult<Json<StandupActiveResponse>> {
    state.store.with_state(|ws| {
        require_channel_member(ws, auth.id, query.channel_id)?;
        let time_finish = ws
            .channel(query.channel_id)
            .and_then(|c| c.standup.as_ref())
            .map(|s| s.time_finish);

        Ok(Json(StandupActiveResponse {
            is_active: time_finish.is_some(),
            time_finish,
        }))
    })
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        require_channel(ws, req.channel_id)?;
        validate_optional_message(&req.message)?;
        if !is_active(ws, req.channel_id) {
            return Err(ApiError::bad_request("no standup is running"));
        }
        require_channel_member(ws, auth.id, req.channel_id)?;

        let line = format!("{}: {}", ws.handle_of(auth.id), req.message);
        if let Some(standup) = ws
            .channel_mut(req.channel_id)
            .and_then(|c| c.standup.as_mut())
        {
            standup.lines.push(line);
        }
        Ok(())
    })?;

    info!(channel_id = req.channel_id, by = auth.id, "standup line buffered");
    Ok(Json(json!({})))
}
