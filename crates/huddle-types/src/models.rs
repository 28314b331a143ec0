use serde::{Deserialize, Serialize};

/// Numeric identifiers. Every id space starts at 1 and never reuses a value.
pub type UserId = u32;
pub type ChannelId = u32;
pub type DmId = u32;
pub type MessageId = u32;

/// Public projection of a user, as returned by profile and membership endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub u_id: UserId,
    pub email: String,
    pub name_first: String,
    pub name_last: String,
    pub handle_str: String,
    pub profile_img_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct React {
    pub react_id: u32,
    pub u_ids: Vec<UserId>,
    /// Whether the user asking for the message is among `u_ids`.
    pub is_this_user_reacted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub message_id: MessageId,
    pub u_id: UserId,
    pub message: String,
    pub time_sent: i64,
    pub reacts: Vec<React>,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSummary {
    pub channel_id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmSummary {
    pub dm_id: DmId,
    pub name: String,
}

/// A notification as delivered to its recipient. Exactly one of
/// `channel_id` / `dm_id` is a real id, the other is `-1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub channel_id: i64,
    pub dm_id: i64,
    pub notification_message: String,
}

// -- Statistics --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsJoinedPoint {
    pub num_channels_joined: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsJoinedPoint {
    pub num_dms_joined: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesSentPoint {
    pub num_messages_sent: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub channels_joined: Vec<ChannelsJoinedPoint>,
    pub dms_joined: Vec<DmsJoinedPoint>,
    pub messages_sent: Vec<MessagesSentPoint>,
    pub involvement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsExistPoint {
    pub num_channels_exist: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsExistPoint {
    pub num_dms_exist: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesExistPoint {
    pub num_messages_exist: u32,
    pub time_stamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceStats {
    pub channels_exist: Vec<ChannelsExistPoint>,
    pub dms_exist: Vec<DmsExistPoint>,
    pub messages_exist: Vec<MessagesExistPoint>,
    pub utilization_rate: f64,
}
