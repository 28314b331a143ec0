/// Longest prefix of a tagging message quoted in its notification.
pub const TAG_PREVIEW_CHARS: usize = 20;

/// Workspace events that land in a user's notification feed.
///
/// `actor` is the handle of the user who caused the event; `place` is the
/// name of the channel or DM it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    /// The recipient was mentioned with `@handle`
    Tagged {
        actor: String,
        place: String,
        text: String,
    },

    /// Someone reacted to a message the recipient wrote
    Reacted { actor: String, place: String },

    /// The recipient was added to a channel or DM
    Added { actor: String, place: String },
}

impl WorkspaceEvent {
    /// The human-readable line shown in the feed.
    pub fn render(&self) -> String {
        match self {
            Self::Tagged { actor, place, text } => {
                let preview: String = text.chars().take(TAG_PREVIEW_CHARS).collect();
                format!("{actor} tagged you in {place}: {preview}")
            }
            Self::Reacted { actor, place } => format!("{actor} reacted to your message in {place}"),
            Self::Added { actor, place } => format!("{actor} added you to {place}"),
        }
    }
}
