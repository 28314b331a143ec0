use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::info;

use huddle_store::paging::page;
use huddle_store::{Target, Workspace, unix_now};
use huddle_types::api::{
    ChannelDetailsResponse, ChannelListResponse, ChannelMemberRequest, ChannelMessagesQuery,
    ChannelRef, CreateChannelRequest, CreateChannelResponse, MessagesPage,
};
use huddle_types::models::{ChannelId, ChannelSummary, UserId, UserProfile};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::middleware::AuthUser;
use crate::notifications::notify_added;
use crate::validation::validate_channel_name;

/// 400 if the channel is unknown, 403 if `user` is not in it.
pub(crate) fn require_channel_member(
    ws: &Workspace,
    user: UserId,
    channel: ChannelId,
) -> ApiResult<()> {
    if ws.channel(channel).is_none() {
        return Err(ApiError::bad_request(format!("channel {channel} does not exist")));
    }
    if !ws.is_channel_member(user, channel) {
        return Err(ApiError::forbidden(format!("not a member of channel {channel}")));
    }
    Ok(())
}

fn require_user(ws: &Workspace, user: UserId) -> ApiResult<()> {
    if ws.active_user(user).is_none() {
        return Err(ApiError::bad_request(format!("user {user} does not exist")));
    }
    Ok(())
}

fn profiles(ws: &Workspace, ids: &[UserId]) -> Vec<UserProfile> {
    ids.iter()
        .filter_map(|&id| ws.user(id))
        .map(|u| u.profile())
        .collect()
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateChannelRequest>,
) -> ApiResult<Json<CreateChannelResponse>> {
    validate_channel_name(&req.name)?;

    let channel_id = state.store.with_state(|ws| {
        let now = unix_now();
        let id = ws.insert_channel(auth.id, &req.name, req.is_public);
        ws.record_memberships(auth.id, now);
        ws.record_workspace(now);
        id
    });

    info!(channel_id, owner = auth.id, is_public = req.is_public, "channel created");
    Ok(Json(CreateChannelResponse { channel_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelListResponse>> {
    let channels = state.store.with_state(|ws| {
        ws.channels
            .values()
            .filter(|c| c.members.contains(&auth.id))
            .map(|c| ChannelSummary {
                channel_id: c.id,
                name: c.name.clone(),
            })
            .collect()
    });
    Ok(Json(ChannelListResponse { channels }))
}

pub async fn list_all(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthUser>,
) -> ApiResult<Json<ChannelListResponse>> {
    let channels = state.store.with_state(|ws| {
        ws.channels
            .values()
            .map(|c| ChannelSummary {
                channel_id: c.id,
                name: c.name.clone(),
            })
            .collect()
    });
    Ok(Json(ChannelListResponse { channels }))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelRef>,
) -> ApiResult<Json<ChannelDetailsResponse>> {
    state.store.with_state(|ws| {
        require_channel_member(ws, auth.id, query.channel_id)?;
        let channel = ws
            .channel(query.channel_id)
            .ok_or_else(|| ApiError::bad_request("channel does not exist"))?;

        Ok(Json(ChannelDetailsResponse {
            name: channel.name.clone(),
            is_public: channel.is_public,
            owner_members: profiles(ws, &channel.owners),
            all_members: profiles(ws, &channel.members),
        }))
    })
}

pub async fn join(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelRef>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        let channel = ws
            .channel(req.channel_id)
            .ok_or_else(|| ApiError::bad_request(format!("channel {} does not exist", req.channel_id)))?;
        if channel.members.contains(&auth.id) {
            return Err(ApiError::bad_request("already a member of this channel"));
        }
        if !channel.is_public && !ws.is_global_owner(auth.id) {
            return Err(ApiError::forbidden("channel is private"));
        }

        let now = unix_now();
        if let Some(channel) = ws.channel_mut(req.channel_id) {
            channel.members.push(auth.id);
        }
        ws.record_memberships(auth.id, now);
        Ok(())
    })?;

    info!(channel_id = req.channel_id, user_id = auth.id, "channel joined");
    Ok(Json(json!({})))
}

pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelMemberRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        if ws.channel(req.channel_id).is_none() {
            return Err(ApiError::bad_request(format!("channel {} does not exist", req.channel_id)));
        }
        require_user(ws, req.u_id)?;
        if ws.is_channel_member(req.u_id, req.channel_id) {
            return Err(ApiError::bad_request("user is already a member"));
        }
        if !ws.is_channel_member(auth.id, req.channel_id) {
            return Err(ApiError::forbidden("not a member of this channel"));
        }

        let now = unix_now();
        if let Some(channel) = ws.channel_mut(req.channel_id) {
            channel.members.push(req.u_id);
        }
        ws.record_memberships(req.u_id, now);
        notify_added(ws, Target::Channel(req.channel_id), auth.id, &[req.u_id]);
        Ok(())
    })?;

    info!(channel_id = req.channel_id, user_id = req.u_id, by = auth.id, "user invited");
    Ok(Json(json!({})))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ChannelMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    state.store.with_state(|ws| {
        require_channel_member(ws, auth.id, query.channel_id)?;
        let messages = ws.messages_of(Target::Channel(query.channel_id));
        page(messages, query.start, auth.id)
            .map(Json)
            .ok_or_else(|| ApiError::bad_request("start is greater than the number of messages"))
    })
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelRef>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        require_channel_member(ws, auth.id, req.channel_id)?;
        let starts_standup = ws
            .channel(req.channel_id)
            .and_then(|c| c.standup.as_ref())
            .is_some_and(|s| s.starter == auth.id);
        if starts_standup {
            return Err(ApiError::bad_request("cannot leave while running the active standup"));
        }

        let now = unix_now();
        if let Some(channel) = ws.channel_mut(req.channel_id) {
            channel.members.retain(|&m| m != auth.id);
            channel.owners.retain(|&m| m != auth.id);
        }
        ws.record_memberships(auth.id, now);
        Ok(())
    })?;

    info!(channel_id = req.channel_id, user_id = auth.id, "channel left");
    Ok(Json(json!({})))
}

pub async fn add_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelMemberRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        if ws.channel(req.channel_id).is_none() {
            return Err(ApiError::bad_request(format!("channel {} does not exist", req.channel_id)));
        }
        require_user(ws, req.u_id)?;
        if !ws.is_channel_member(req.u_id, req.channel_id) {
            return Err(ApiError::bad_request("user is not a member of this channel"));
        }
        if ws.is_channel_owner(req.u_id, req.channel_id) {
            return Err(ApiError::bad_request("user is already an owner"));
        }
        if !ws.has_channel_owner_perms(auth.id, req.channel_id) {
            return Err(ApiError::forbidden("owner permissions required"));
        }

        if let Some(channel) = ws.channel_mut(req.channel_id) {
            channel.owners.push(req.u_id);
        }
        Ok(())
    })?;

    info!(channel_id = req.channel_id, user_id = req.u_id, "channel owner added");
    Ok(Json(json!({})))
}

pub async fn remove_owner(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<ChannelMemberRequest>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        let channel = ws
            .channel(req.channel_id)
            .ok_or_else(|| ApiError::bad_request(format!("channel {} does not exist", req.channel_id)))?;
        require_user(ws, req.u_id)?;
        if !channel.owners.contains(&req.u_id) {
            return Err(ApiError::bad_request("user is not an owner"));
        }
        if channel.owners.len() == 1 {
            return Err(ApiError::bad_request("cannot remove the only owner"));
        }
        if !ws.has_channel_owner_perms(auth.id, req.channel_id) {
            return Err(ApiError::forbidden("owner permissions required"));
        }

        if let Some(channel) = ws.channel_mut(req.channel_id) {
            channel.owners.retain(|&m| m != req.u_id);
        }
        Ok(())
    })?;

    info!(channel_id = req.channel_id, user_id = req.u_id, "channel owner removed");
    Ok(Json(json!({})))
}
