use huddle_types::api::MessagesPage;
use huddle_types::models::UserId;

use crate::models::MessageRecord;

pub const PAGE_SIZE: u32 = 50;

/// Up to [`PAGE_SIZE`] messages, newest first, skipping the `start` most
/// recent. `None` when `start` is past the end of the history.
///
/// `messages` is stored oldest first.
pub fn page(messages: &[MessageRecord], start: u32, viewer: UserId) -> Option<MessagesPage> {
    let total = messages.len() as u64;
    if u64::from(start) > total {
        return None;
    }

    let page: Vec<_> = messages
        .iter()
        .rev()
        .skip(start as usize)
        .take(PAGE_SIZE as usize)
        .map(|m| m.view(viewer))
        .collect();

    let next = u64::from(start) + u64::from(PAGE_SIZE);
    let end = if next >= total { -1 } else { next as i64 };

    Some(MessagesPage {
        messages: page,
        start,
        end,
    })
}
