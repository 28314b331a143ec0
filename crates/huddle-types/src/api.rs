use serde::{Deserialize, Serialize};

use crate::models::{
    ChannelId, ChannelSummary, DmId, DmSummary, Message, MessageId, Notification, UserId,
    UserProfile, UserStats, WorkspaceStats,
};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned by both register and login.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub auth_user_id: UserId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub reset_code: String,
    pub new_password: String,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateChannelRequest {
    pub name: String,
    pub is_public: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChannelResponse {
    pub channel_id: ChannelId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub channels: Vec<ChannelSummary>,
}

/// Query string or body naming a single channel.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRef {
    pub channel_id: ChannelId,
}

/// Channel plus a target user: invite, addowner, removeowner.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ChannelMemberRequest {
    pub channel_id: ChannelId,
    pub u_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetailsResponse {
    pub name: String,
    pub is_public: bool,
    pub owner_members: Vec<UserProfile>,
    pub all_members: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMessagesQuery {
    pub channel_id: ChannelId,
    pub start: u32,
}

/// One page of a channel's or DM's history, newest first.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    pub start: u32,
    /// `-1` once the oldest message has been returned.
    pub end: i64,
}

// -- DMs --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateDmRequest {
    pub u_ids: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDmResponse {
    pub dm_id: DmId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmListResponse {
    pub dms: Vec<DmSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmRef {
    pub dm_id: DmId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DmDetailsResponse {
    pub name: String,
    pub members: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmMessagesQuery {
    pub dm_id: DmId,
    pub start: u32,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub channel_id: ChannelId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendDmRequest {
    pub dm_id: DmId,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIdResponse {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub message_id: MessageId,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ReactRequest {
    pub message_id: MessageId,
    pub react_id: u32,
}

/// `channel_id` and `dm_id` use `-1` for "not this one".
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct ShareMessageRequest {
    pub og_message_id: MessageId,
    #[serde(default)]
    pub message: String,
    pub channel_id: i64,
    pub dm_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareMessageResponse {
    pub shared_message_id: MessageId,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendLaterRequest {
    pub channel_id: ChannelId,
    pub message: String,
    pub time_sent: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendLaterDmRequest {
    pub dm_id: DmId,
    pub message: String,
    pub time_sent: i64,
}

// -- Standups --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct StandupStartRequest {
    pub channel_id: ChannelId,
    pub length: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupStartResponse {
    pub time_finish: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandupActiveResponse {
    pub is_active: bool,
    pub time_finish: Option<i64>,
}

// -- Users --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub u_id: UserId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsersAllResponse {
    pub users: Vec<UserProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SetNameRequest {
    pub name_first: String,
    pub name_last: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetEmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SetHandleRequest {
    pub handle_str: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user_stats: UserStats,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStatsResponse {
    pub workspace_stats: WorkspaceStats,
}

// -- Admin --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct PermissionChangeRequest {
    pub u_id: UserId,
    pub permission_id: i64,
}

// -- Notifications & search --

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query_str: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub messages: Vec<Message>,
}
