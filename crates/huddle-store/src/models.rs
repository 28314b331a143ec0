//! Record types held by the in-memory workspace.
//! Distinct from huddle-types projections: records hold ids where the wire
//! format holds denormalized profiles, so renames show up everywhere at once.

use std::collections::{BTreeMap, HashMap};

use huddle_types::models::{ChannelId, DmId, Message, MessageId, React, UserId, UserProfile};

/// Global permission level. The numeric ids are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Owner,
    Member,
}

impl Permission {
    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Owner),
            2 => Some(Self::Member),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        match self {
            Self::Owner => 1,
            Self::Member => 2,
        }
    }
}

/// Where a message lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Channel(ChannelId),
    Dm(DmId),
}

pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name_first: String,
    pub name_last: String,
    pub handle: String,
    pub permission: Permission,
    pub profile_img_url: String,
    /// Set by admin removal. The record stays so old ids keep resolving.
    pub removed: bool,
    /// Oldest first; read back newest first.
    pub notifications: Vec<NotificationRecord>,
    pub stats: UserStatsRecord,
}

impl UserRecord {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            u_id: self.id,
            email: self.email.clone(),
            name_first: self.name_first.clone(),
            name_last: self.name_last.clone(),
            handle_str: self.handle.clone(),
            profile_img_url: self.profile_img_url.clone(),
        }
    }

    pub fn is_global_owner(&self) -> bool {
        !self.removed && self.permission == Permission::Owner
    }
}

pub struct NotificationRecord {
    pub target: Target,
    pub message: String,
}

pub struct ChannelRecord {
    pub id: ChannelId,
    pub name: String,
    pub is_public: bool,
    pub owners: Vec<UserId>,
    pub members: Vec<UserId>,
    /// Oldest first.
    pub messages: Vec<MessageRecord>,
    pub standup: Option<Standup>,
}

pub struct Standup {
    pub starter: UserId,
    pub time_finish: i64,
    /// Buffered `handle: text` lines, in arrival order.
    pub lines: Vec<String>,
}

pub struct DmRecord {
    pub id: DmId,
    pub name: String,
    pub creator: UserId,
    pub members: Vec<UserId>,
    /// Oldest first.
    pub messages: Vec<MessageRecord>,
    /// Set by dm/remove, which empties the DM but keeps its id taken.
    pub removed: bool,
}

#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: MessageId,
    pub author: UserId,
    pub text: String,
    pub time_sent: i64,
    pub reacts: Vec<ReactRecord>,
    pub is_pinned: bool,
}

impl MessageRecord {
    pub fn new(id: MessageId, author: UserId, text: String, time_sent: i64) -> Self {
        Self {
            id,
            author,
            text,
            time_sent,
            reacts: vec![],
            is_pinned: false,
        }
    }

    /// Wire projection as seen by `viewer`.
    pub fn view(&self, viewer: UserId) -> Message {
        Message {
            message_id: self.id,
            u_id: self.author,
            message: self.text.clone(),
            time_sent: self.time_sent,
            reacts: self
                .reacts
                .iter()
                .map(|r| React {
                    react_id: r.react_id,
                    u_ids: r.users.clone(),
                    is_this_user_reacted: r.users.contains(&viewer),
                })
                .collect(),
            is_pinned: self.is_pinned,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReactRecord {
    pub react_id: u32,
    pub users: Vec<UserId>,
}

/// One `(count, timestamp)` sample of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatPoint {
    pub count: u32,
    pub time_stamp: i64,
}

#[derive(Default)]
pub struct UserStatsRecord {
    pub channels_joined: Vec<StatPoint>,
    pub dms_joined: Vec<StatPoint>,
    pub messages_sent: Vec<StatPoint>,
}

#[derive(Default)]
pub struct WorkspaceStatsRecord {
    pub channels_exist: Vec<StatPoint>,
    pub dms_exist: Vec<StatPoint>,
    pub messages_exist: Vec<StatPoint>,
}

/// The whole workspace. One value per server; `/clear` replaces it with
/// `Workspace::default()`.
#[derive(Default)]
pub struct Workspace {
    pub users: BTreeMap<UserId, UserRecord>,
    /// Hashed token -> owning user.
    pub sessions: HashMap<String, UserId>,
    pub channels: BTreeMap<ChannelId, ChannelRecord>,
    pub dms: BTreeMap<DmId, DmRecord>,
    /// Message id -> parent, for every message currently visible.
    pub message_index: HashMap<MessageId, Target>,
    /// Outstanding password-reset code -> user.
    pub reset_codes: HashMap<String, UserId>,
    pub stats: WorkspaceStatsRecord,
    pub(crate) last_user_id: UserId,
    pub(crate) last_channel_id: ChannelId,
    pub(crate) last_dm_id: DmId,
    pub(crate) last_message_id: MessageId,
}
