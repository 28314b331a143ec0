use axum::{Extension, Json, extract::State};
use tracing::debug;

use huddle_store::{Target, Workspace};
use huddle_types::api::{SearchQuery, SearchResponse};
use huddle_types::models::{Message, UserId};

use crate::auth::AppState;
use crate::error::ApiResult;
use crate::extract::Query;
use crate::middleware::AuthUser;
use crate::validation::validate_query;

/// Messages in every channel and DM `user` belongs to whose text contains
/// `needle`, ignoring case. Channels come before DMs, each oldest first.
pub fn search_messages(ws: &Workspace, user: UserId, needle: &str) -> Vec<Message> {
    let needle = needle.to_lowercase();
    let channels = ws
        .channels
        .values()
        .filter(|c| c.members.contains(&user))
        .map(|c| Target::Channel(c.id));
    let dms = ws
        .dms
        .values()
        .filter(|d| d.members.contains(&user))
        .map(|d| Target::Dm(d.id));

    channels
        .chain(dms)
        .flat_map(|target| ws.messages_of(target))
        .filter(|m| m.text.to_lowercase().contains(&needle))
        .map(|m| m.view(user))
        .collect()
}

pub async fn search(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    validate_query(&query.query_str)?;

    let messages = state
        .store
        .with_state(|ws| search_messages(ws, auth.id, &query.query_str));
    debug!(user_id = auth.id, hits = messages.len(), "search");
    Ok(Json(SearchResponse { messages }))
}
