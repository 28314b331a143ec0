use std::collections::HashSet;

use axum::{Extension, extract::State};
use serde_json::{Value, json};
use tracing::info;

use huddle_store::paging::page;
use huddle_store::{Target, Workspace, unix_now};
use huddle_types::api::{
    CreateDmRequest, CreateDmResponse, DmDetailsResponse, DmListResponse, DmMessagesQuery, DmRef,
    MessagesPage,
};
use huddle_types::models::{DmId, DmSummary, UserId};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Query};
use crate::middleware::AuthUser;
use crate::notifications::notify_added;

/// 400 if the DM is unknown, 403 if `user` is not in it. A removed DM still
/// exists, it just has nobody in it.
pub(crate) fn require_dm_member(ws: &Workspace, user: UserId, dm: DmId) -> ApiResult<()> {
    if ws.dm(dm).is_none() {
        return Err(ApiError::bad_request(format!("dm {dm} does not exist")));
    }
    if !ws.is_dm_member(user, dm) {
        return Err(ApiError::forbidden(format!("not a member of dm {dm}")));
    }
    Ok(())
}

pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateDmRequest>,
) -> ApiResult<Json<CreateDmResponse>> {
    let dm_id = state.store.with_state(|ws| {
        let mut seen = HashSet::from([auth.id]);
        for &id in &req.u_ids {
            if ws.active_user(id).is_none() {
                return Err(ApiError::bad_request(format!("user {id} does not exist")));
            }
            if !seen.insert(id) {
                return Err(ApiError::bad_request(format!("user {id} is listed twice")));
            }
        }

        let now = unix_now();
        let id = ws.insert_dm(auth.id, &req.u_ids);
        ws.record_memberships(auth.id, now);
        for &member in &req.u_ids {
            ws.record_memberships(member, now);
        }
        ws.record_workspace(now);
        notify_added(ws, Target::Dm(id), auth.id, &req.u_ids);
        Ok(id)
    })?;

    info!(dm_id, creator = auth.id, members = req.u_ids.len() + 1, "dm created");
    Ok(Json(CreateDmResponse { dm_id }))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<DmListResponse>> {
    let dms = state.store.with_state(|ws| {
        ws.dms
            .values()
            .filter(|d| d.members.contains(&auth.id))
            .map(|d| DmSummary {
                dm_id: d.id,
                name: d.name.clone(),
            })
            .collect()
    });
    Ok(Json(DmListResponse { dms }))
}

pub async fn remove(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmRef>,
) -> ApiResult<Json<Value>> {
    let cancelled = state.store.with_state(|ws| {
        if ws.dm(query.dm_id).is_none() {
            return Err(ApiError::bad_request(format!("dm {} does not exist", query.dm_id)));
        }
        if !ws.has_dm_owner_perms(auth.id, query.dm_id) {
            return Err(ApiError::forbidden("only the creator may remove a dm"));
        }

        let now = unix_now();
        let cancelled = state.scheduler.cancel_parent(Target::Dm(query.dm_id));
        for member in ws.empty_dm(query.dm_id) {
            ws.record_memberships(member, now);
        }
        ws.record_workspace(now);
        Ok(cancelled)
    })?;

    info!(dm_id = query.dm_id, cancelled_sends = cancelled, "dm removed");
    Ok(Json(json!({})))
}

pub async fn details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmRef>,
) -> ApiResult<Json<DmDetailsResponse>> {
    state.store.with_state(|ws| {
        require_dm_member(ws, auth.id, query.dm_id)?;
        let dm = ws
            .dm(query.dm_id)
            .ok_or_else(|| ApiError::bad_request("dm does not exist"))?;

        Ok(Json(DmDetailsResponse {
            name: dm.name.clone(),
            members: dm
                .members
                .iter()
                .filter_map(|&id| ws.user(id))
                .map(|u| u.profile())
                .collect(),
        }))
    })
}

pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<DmRef>,
) -> ApiResult<Json<Value>> {
    state.store.with_state(|ws| {
        require_dm_member(ws, auth.id, req.dm_id)?;
        if let Some(dm) = ws.dm_mut(req.dm_id) {
            dm.members.retain(|&m| m != auth.id);
        }
        ws.record_memberships(auth.id, unix_now());
        Ok::<_, ApiError>(())
    })?;

    info!(dm_id = req.dm_id, user_id = auth.id, "dm left");
    Ok(Json(json!({})))
}

pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<DmMessagesQuery>,
) -> ApiResult<Json<MessagesPage>> {
    state.store.with_state(|ws| {
        require_dm_member(ws, auth.id, query.dm_id)?;
        let messages = ws.messages_of(Target::Dm(query.dm_id));
        page(messages, query.start, auth.id)
            .map(Json)
            .ok_or_else(|| ApiError::bad_request("start is greater than the number of messages"))
    })
}
