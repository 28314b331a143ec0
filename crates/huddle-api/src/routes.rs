use axum::{
    Json, Router,
    extract::State,
    middleware,
    routing::{delete, get, post, put},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::middleware::require_auth;
use crate::{
    admin, channels, dms, messages, notifications, reactions, search, standups, users,
};

/// Reset the whole server: every user, session, channel, DM and pending timer.
pub async fn clear(State(state): State<AppState>) -> Json<Value> {
    state.clear();
    Json(json!({}))
}

/// The full HTTP surface. Everything except registration, login, password
/// reset and `/clear` needs a valid `token` header.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register/v3", post(auth::register))
        .route("/auth/login/v3", post(auth::login))
        .route("/auth/passwordreset/request/v1", post(auth::password_reset_request))
        .route("/auth/passwordreset/reset/v1", post(auth::password_reset_confirm))
        .route("/clear/v1", delete(clear));

    let protected_routes = Router::new()
        .route("/auth/logout/v2", post(auth::logout))
        // Channels
        .route("/channels/create/v3", post(channels::create))
        .route("/channels/list/v3", get(channels::list))
        .route("/channels/listall/v3", get(channels::list_all))
        .route("/channel/details/v3", get(channels::details))
        .route("/channel/join/v3", post(channels::join))
        .route("/channel/invite/v3", post(channels::invite))
        .route("/channel/messages/v3", get(channels::messages))
        .route("/channel/leave/v2", post(channels::leave))
        .route("/channel/addowner/v2", post(channels::add_owner))
        .route("/channel/removeowner/v2", post(channels::remove_owner))
        // DMs
        .route("/dm/create/v2", post(dms::create))
        .route("/dm/list/v2", get(dms::list))
        .route("/dm/remove/v2", delete(dms::remove))
        .route("/dm/details/v2", get(dms::details))
        .route("/dm/leave/v2", post(dms::leave))
        .route("/dm/messages/v2", get(dms::messages))
        // Messages
        .route("/message/send/v2", post(messages::send))
        .route("/message/senddm/v2", post(messages::send_dm))
        .route("/message/edit/v2", put(messages::edit))
        .route("/message/remove/v2", delete(messages::remove))
        .route("/message/share/v1", post(messages::share))
        .route("/message/sendlater/v1", post(messages::send_later_channel))
        .route("/message/sendlaterdm/v1", post(messages::send_later_dm))
        .route("/message/react/v1", post(reactions::react))
        .route("/message/unreact/v1", post(reactions::unreact))
        .route("/message/pin/v1", post(reactions::pin))
        .route("/message/unpin/v1", post(reactions::unpin))
        // Standups
        .route("/standup/start/v1", post(standups::start))
        .route("/standup/active/v1", get(standups::active))
        .route("/standup/send/v1", post(standups::send))
        // Users
        .route("/user/profile/v3", get(users::profile))
        .route("/users/all/v2", get(users::all))
        .route("/user/profile/setname/v2", put(users::set_name))
        .route("/user/profile/setemail/v2", put(users::set_email))
        .route("/user/profile/sethandle/v2", put(users::set_handle))
        .route("/user/stats/v1", get(users::user_stats))
        .route("/users/stats/v1", get(users::workspace_stats))
        // Admin and the rest
        .route("/admin/user/remove/v1", delete(admin::remove_user))
        .route("/admin/userpermission/change/v1", post(admin::change_permission))
        .route("/notifications/get/v1", get(notifications::get_notifications))
        .route("/search/v1", get(search::search))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
