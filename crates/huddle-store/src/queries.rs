use huddle_types::events::WorkspaceEvent;
use huddle_types::models::{ChannelId, DmId, MessageId, Notification, UserId};
use tracing::debug;

use crate::handles::{base_handle, unique_handle};
use crate::models::{
    ChannelRecord, DmRecord, MessageRecord, NotificationRecord, Permission, StatPoint, Target,
    UserRecord, UserStatsRecord, Workspace,
};

/// Number of notifications returned by a feed read.
pub const FEED_LIMIT: usize = 20;

impl Workspace {
    // -- Users --

    /// Create a user with a freshly derived handle. The first user ever
    /// registered becomes a global owner.
    pub fn insert_user(
        &mut self,
        email: &str,
        password_hash: &str,
        name_first: &str,
        name_last: &str,
        profile_img_url: &str,
        now: i64,
    ) -> UserId {
        let handle = unique_handle(&base_handle(name_first, name_last), |h| {
            self.handle_taken(h, None)
        });
        let permission = if self.users.is_empty() {
            Permission::Owner
        } else {
            Permission::Member
        };

        self.last_user_id += 1;
        let id = self.last_user_id;

        let mut stats = UserStatsRecord::default();
        for series in [
            &mut stats.channels_joined,
            &mut stats.dms_joined,
            &mut stats.messages_sent,
        ] {
            series.push(StatPoint {
                count: 0,
                time_stamp: now,
            });
        }

        self.users.insert(
            id,
            UserRecord {
                id,
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                name_first: name_first.to_string(),
                name_last: name_last.to_string(),
                handle,
                permission,
                profile_img_url: profile_img_url.to_string(),
                removed: false,
                notifications: vec![],
                stats,
            },
        );
        self.record_workspace(now);

        debug!(user_id = id, "user inserted");
        id
    }

    /// Any user ever registered, removed ones included.
    pub fn user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut UserRecord> {
        self.users.get_mut(&id)
    }

    pub fn active_user(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id).filter(|u| !u.removed)
    }

    pub fn active_users(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values().filter(|u| !u.removed)
    }

    /// Case-insensitive lookup among active users.
    pub fn user_by_email(&self, email: &str) -> Option<&UserRecord> {
        self.active_users()
            .find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn user_by_handle(&self, handle: &str) -> Option<&UserRecord> {
        self.active_users().find(|u| u.handle == handle)
    }

    /// Whether an active user other than `except` already uses `email`.
    pub fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        self.user_by_email(email)
            .is_some_and(|u| Some(u.id) != except)
    }

    pub fn handle_taken(&self, handle: &str, except: Option<UserId>) -> bool {
        self.user_by_handle(handle)
            .is_some_and(|u| Some(u.id) != except)
    }

    pub fn is_global_owner(&self, id: UserId) -> bool {
        self.user(id).is_some_and(UserRecord::is_global_owner)
    }

    pub fn global_owner_count(&self) -> usize {
        self.active_users().filter(|u| u.is_global_owner()).count()
    }

    /// Handle for display; empty for unknown ids.
    pub fn handle_of(&self, id: UserId) -> String {
        self.user(id).map(|u| u.handle.clone()).unwrap_or_default()
    }

    // -- Sessions --

    pub fn insert_session(&mut self, token_hash: String, user: UserId) {
        self.sessions.insert(token_hash, user);
    }

    pub fn resolve_session(&self, token_hash: &str) -> Option<UserId> {
        self.sessions.get(token_hash).copied()
    }

    pub fn remove_session(&mut self, token_hash: &str) -> bool {
        self.sessions.remove(token_hash).is_some()
    }

    /// Invalidate every token held by `user`. Returns how many were dropped.
    pub fn clear_sessions(&mut self, user: UserId) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, owner| *owner != user);
        before - self.sessions.len()
    }

    // -- Channels --

    pub fn insert_channel(&mut self, owner: UserId, name: &str, is_public: bool) -> ChannelId {
        self.last_channel_id += 1;
        let id = self.last_channel_id;
        self.channels.insert(
            id,
            ChannelRecord {
                id,
                name: name.to_string(),
                is_public,
                owners: vec![owner],
                members: vec![owner],
                messages: vec![],
                standup: None,
            },
        );
        id
    }

    pub fn channel(&self, id: ChannelId) -> Option<&ChannelRecord> {
        self.channels.get(&id)
    }

    pub fn channel_mut(&mut self, id: ChannelId) -> Option<&mut ChannelRecord> {
        self.channels.get_mut(&id)
    }

    pub fn is_channel_member(&self, user: UserId, channel: ChannelId) -> bool {
        self.channel(channel)
            .is_some_and(|c| c.members.contains(&user))
    }

    pub fn is_channel_owner(&self, user: UserId, channel: ChannelId) -> bool {
        self.channel(channel)
            .is_some_and(|c| c.owners.contains(&user))
    }

    /// Channel owners, and global owners who are members, may manage the
    /// channel's owners and anyone's messages in it.
    pub fn has_channel_owner_perms(&self, user: UserId, channel: ChannelId) -> bool {
        self.is_channel_member(user, channel)
            && (self.is_channel_owner(user, channel) || self.is_global_owner(user))
    }

    // -- DMs --

    /// Create a DM between `creator` and `others`. The name is every
    /// member's handle, sorted, joined with `", "`.
    pub fn insert_dm(&mut self, creator: UserId, others: &[UserId]) -> DmId {
        let mut members = Vec::with_capacity(others.len() + 1);
        members.push(creator);
        members.extend_from_slice(others);

        let mut handles: Vec<String> = members.iter().map(|&m| self.handle_of(m)).collect();
        handles.sort();

        self.last_dm_id += 1;
        let id = self.last_dm_id;
        self.dms.insert(
            id,
            DmRecord {
                id,
                name: handles.join(", "),
                creator,
                members,
                messages: vec![],
                removed: false,
            },
        );
        id
    }

    pub fn dm(&self, id: DmId) -> Option<&DmRecord> {
        self.dms.get(&id)
    }

    pub fn dm_mut(&mut self, id: DmId) -> Option<&mut DmRecord> {
        self.dms.get_mut(&id)
    }

    pub fn is_dm_member(&self, user: UserId, dm: DmId) -> bool {
        self.dm(dm).is_some_and(|d| d.members.contains(&user))
    }

    /// Only the creator, while still a member, holds owner rights in a DM.
    pub fn has_dm_owner_perms(&self, user: UserId, dm: DmId) -> bool {
        self.dm(dm)
            .is_some_and(|d| d.creator == user && d.members.contains(&user))
    }

    /// Empty a DM: drop members and messages, keep the record.
    /// Returns the former members.
    pub fn empty_dm(&mut self, id: DmId) -> Vec<UserId> {
        let Some(dm) = self.dms.get_mut(&id) else {
            return vec![];
        };
        dm.removed = true;
        let members = std::mem::take(&mut dm.members);
        for message in std::mem::take(&mut dm.messages) {
            self.message_index.remove(&message.id);
        }
        members
    }

    // -- Targets --

    pub fn target_exists(&self, target: Target) -> bool {
        match target {
            Target::Channel(id) => self.channels.contains_key(&id),
            Target::Dm(id) => self.dms.contains_key(&id),
        }
    }

    /// Whether messages may still be delivered into `target`.
    pub fn target_is_live(&self, target: Target) -> bool {
        match target {
            Target::Channel(id) => self.channels.contains_key(&id),
            Target::Dm(id) => self.dm(id).is_some_and(|d| !d.removed),
        }
    }

    pub fn target_name(&self, target: Target) -> String {
        let name = match target {
            Target::Channel(id) => self.channel(id).map(|c| c.name.clone()),
            Target::Dm(id) => self.dm(id).map(|d| d.name.clone()),
        };
        name.unwrap_or_default()
    }

    pub fn target_members(&self, target: Target) -> &[UserId] {
        let members = match target {
            Target::Channel(id) => self.channel(id).map(|c| c.members.as_slice()),
            Target::Dm(id) => self.dm(id).map(|d| d.members.as_slice()),
        };
        members.unwrap_or(&[])
    }

    pub fn is_member(&self, user: UserId, target: Target) -> bool {
        match target {
            Target::Channel(id) => self.is_channel_member(user, id),
            Target::Dm(id) => self.is_dm_member(user, id),
        }
    }

    pub fn has_owner_perms(&self, user: UserId, target: Target) -> bool {
        match target {
            Target::Channel(id) => self.has_channel_owner_perms(user, id),
            Target::Dm(id) => self.has_dm_owner_perms(user, id),
        }
    }

    pub fn messages_of(&self, target: Target) -> &[MessageRecord] {
        let messages = match target {
            Target::Channel(id) => self.channel(id).map(|c| c.messages.as_slice()),
            Target::Dm(id) => self.dm(id).map(|d| d.messages.as_slice()),
        };
        messages.unwrap_or(&[])
    }

    fn messages_mut(&mut self, target: Target) -> Option<&mut Vec<MessageRecord>> {
        match target {
            Target::Channel(id) => self.channels.get_mut(&id).map(|c| &mut c.messages),
            Target::Dm(id) => self.dms.get_mut(&id).map(|d| &mut d.messages),
        }
    }

    // -- Messages --

    /// Take the next message id without inserting anything. Used by
    /// scheduled sends, whose id is handed out before the message exists.
    pub fn reserve_message_id(&mut self) -> MessageId {
        self.last_message_id += 1;
        self.last_message_id
    }

    /// Append `message` to `target`. Returns `false` if `target` is unknown.
    pub fn insert_message(&mut self, target: Target, message: MessageRecord) -> bool {
        let id = message.id;
        let Some(messages) = self.messages_mut(target) else {
            return false;
        };
        messages.push(message);
        self.message_index.insert(id, target);
        true
    }

    pub fn post_message(
        &mut self,
        target: Target,
        author: UserId,
        text: String,
        time_sent: i64,
    ) -> MessageId {
        let id = self.reserve_message_id();
        self.insert_message(target, MessageRecord::new(id, author, text, time_sent));
        id
    }

    pub fn locate_message(&self, id: MessageId) -> Option<Target> {
        self.message_index.get(&id).copied()
    }

    /// Parent of message `id`, provided `user` belongs to it.
    pub fn visible_message(&self, user: UserId, id: MessageId) -> Option<Target> {
        self.locate_message(id)
            .filter(|&target| self.is_member(user, target))
    }

    pub fn message(&self, id: MessageId) -> Option<&MessageRecord> {
        let target = self.locate_message(id)?;
        self.messages_of(target).iter().find(|m| m.id == id)
    }

    pub fn message_mut(&mut self, id: MessageId) -> Option<&mut MessageRecord> {
        let target = self.locate_message(id)?;
        self.messages_mut(target)?.iter_mut().find(|m| m.id == id)
    }

    /// Splice message `id` out of its parent.
    pub fn remove_message(&mut self, id: MessageId) -> Option<MessageRecord> {
        let target = self.message_index.remove(&id)?;
        let messages = self.messages_mut(target)?;
        let pos = messages.iter().position(|m| m.id == id)?;
        Some(messages.remove(pos))
    }

    // -- Notifications --

    pub fn notify(&mut self, user: UserId, target: Target, event: &WorkspaceEvent) {
        if let Some(record) = self.users.get_mut(&user) {
            record.notifications.push(NotificationRecord {
                target,
                message: event.render(),
            });
        }
    }

    /// The most recent [`FEED_LIMIT`] notifications, newest first.
    pub fn notifications(&self, user: UserId) -> Vec<Notification> {
        let Some(record) = self.user(user) else {
            return vec![];
        };
        record
            .notifications
            .iter()
            .rev()
            .take(FEED_LIMIT)
            .map(|n| {
                let (channel_id, dm_id) = match n.target {
                    Target::Channel(id) => (i64::from(id), -1),
                    Target::Dm(id) => (-1, i64::from(id)),
                };
                Notification {
                    channel_id,
                    dm_id,
                    notification_message: n.message.clone(),
                }
            })
            .collect()
    }
}
