use axum::{Extension, Json, extract::State};
use lazy_static::lazy_static;
use regex::Regex;

use huddle_store::{Target, Workspace};
use huddle_types::api::NotificationsResponse;
use huddle_types::events::WorkspaceEvent;
use huddle_types::models::UserId;

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::middleware::AuthUser;

lazy_static! {
    static ref TAG_REGEX: Regex = Regex::new(r"@([A-Za-z0-9]+)").unwrap();
}

/// Handles mentioned with `@handle`, in order of first mention.
pub fn tagged_handles(text: &str) -> Vec<&str> {
    let mut handles: Vec<&str> = vec![];
    for cap in TAG_REGEX.captures_iter(text) {
        if let Some(m) = cap.get(1) {
            if !handles.contains(&m.as_str()) {
                handles.push(m.as_str());
            }
        }
    }
    handles
}

/// Notify every member of `target` tagged in `text`, once each.
pub(crate) fn notify_tagged(ws: &mut Workspace, target: Target, sender: UserId, text: &str) {
    let recipients: Vec<UserId> = tagged_handles(text)
        .into_iter()
        .filter_map(|handle| ws.user_by_handle(handle).map(|u| u.id))
        .filter(|&id| ws.is_member(id, target))
        .collect();
    if recipients.is_empty() {
        return;
    }

    let event = WorkspaceEvent::Tagged {
        actor: ws.handle_of(sender),
        place: ws.target_name(target),
        text: text.to_string(),
    };
    for id in recipients {
        ws.notify(id, target, &event);
    }
}

pub(crate) fn notify_reacted(ws: &mut Workspace, target: Target, reactor: UserId, author: UserId) {
    if !ws.is_member(author, target) {
        return;
    }
    let event = WorkspaceEvent::Reacted {
        actor: ws.handle_of(reactor),
        place: ws.target_name(target),
    };
    ws.notify(author, target, &event);
}

pub(crate) fn notify_added(ws: &mut Workspace, target: Target, actor: UserId, added: &[UserId]) {
    let event = WorkspaceEvent::Added {
        actor: ws.handle_of(actor),
        place: ws.target_name(target),
    };
    for &id in added {
        ws.notify(id, target, &event);
    }
}

pub async fn get_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<NotificationsResponse>> {
    let notifications = state.store.with_state(|ws| ws.notifications(auth.id));
    Ok(Json(NotificationsResponse { notifications }))
}
