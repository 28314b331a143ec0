use huddle_types::models::{
    ChannelsExistPoint, ChannelsJoinedPoint, DmsExistPoint, DmsJoinedPoint, MessagesExistPoint,
    MessagesSentPoint, UserId, UserStats, WorkspaceStats,
};

use crate::models::{StatPoint, Workspace};

/// Append a sample unless the series already ends at `count`.
fn push_point(series: &mut Vec<StatPoint>, count: u32, time_stamp: i64) {
    if series.last().map(|p| p.count) != Some(count) {
        series.push(StatPoint { count, time_stamp });
    }
}

fn latest(series: &[StatPoint]) -> u32 {
    series.last().map_or(0, |p| p.count)
}

fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    (f64::from(numerator) / f64::from(denominator)).min(1.0)
}

impl Workspace {
    pub fn channels_joined_by(&self, user: UserId) -> u32 {
        self.channels
            .values()
            .filter(|c| c.members.contains(&user))
            .count() as u32
    }

    pub fn dms_joined_by(&self, user: UserId) -> u32 {
        self.dms
            .values()
            .filter(|d| !d.removed && d.members.contains(&user))
            .count() as u32
    }

    fn dms_existing(&self) -> u32 {
        self.dms.values().filter(|d| !d.removed).count() as u32
    }

    /// Sample `user`'s channel and DM membership counts.
    pub fn record_memberships(&mut self, user: UserId, now: i64) {
        let channels = self.channels_joined_by(user);
        let dms = self.dms_joined_by(user);
        if let Some(record) = self.users.get_mut(&user) {
            push_point(&mut record.stats.channels_joined, channels, now);
            push_point(&mut record.stats.dms_joined, dms, now);
        }
    }

    pub fn record_message_sent(&mut self, user: UserId, now: i64) {
        if let Some(record) = self.users.get_mut(&user) {
            let sent = latest(&record.stats.messages_sent) + 1;
            push_point(&mut record.stats.messages_sent, sent, now);
        }
    }

    /// Sample the workspace-wide channel, DM and message counts.
    pub fn record_workspace(&mut self, now: i64) {
        let channels = self.channels.len() as u32;
        let dms = self.dms_existing();
        let messages = self.message_index.len() as u32;
        push_point(&mut self.stats.channels_exist, channels, now);
        push_point(&mut self.stats.dms_exist, dms, now);
        push_point(&mut self.stats.messages_exist, messages, now);
    }

    pub fn user_stats(&self, user: UserId) -> Option<UserStats> {
        let record = self.users.get(&user)?;
        let stats = &record.stats;

        let joined = latest(&stats.channels_joined) + latest(&stats.dms_joined);
        let sent = latest(&stats.messages_sent);
        let existing =
            self.channels.len() as u32 + self.dms_existing() + self.message_index.len() as u32;

        Some(UserStats {
            channels_joined: stats
                .channels_joined
                .iter()
                .map(|p| ChannelsJoinedPoint {
                    num_channels_joined: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            dms_joined: stats
                .dms_joined
                .iter()
                .map(|p| DmsJoinedPoint {
                    num_dms_joined: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            messages_sent: stats
                .messages_sent
                .iter()
                .map(|p| MessagesSentPoint {
                    num_messages_sent: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            involvement_rate: ratio(joined + sent, existing),
        })
    }

    pub fn workspace_stats(&self) -> WorkspaceStats {
        let active: Vec<UserId> = self.active_users().map(|u| u.id).collect();
        let involved = active
            .iter()
            .filter(|&&id| self.channels_joined_by(id) + self.dms_joined_by(id) > 0)
            .count() as u32;

        WorkspaceStats {
            channels_exist: self
                .stats
                .channels_exist
                .iter()
                .map(|p| ChannelsExistPoint {
                    num_channels_exist: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            dms_exist: self
                .stats
                .dms_exist
                .iter()
                .map(|p| DmsExistPoint {
                    num_dms_exist: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            messages_exist: self
                .stats
                .messages_exist
                .iter()
                .map(|p| MessagesExistPoint {
                    num_messages_exist: p.count,
                    time_stamp: p.time_stamp,
                })
                .collect(),
            utilization_rate: ratio(involved, active.len() as u32),
        }
    }
}
