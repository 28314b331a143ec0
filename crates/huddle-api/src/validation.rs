//! Input validation shared by the handlers.
//!
//! Each check returns the `ApiError` the caller should surface, so handlers
//! can chain them with `?` before touching the workspace.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, ApiResult};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_CHANNEL_NAME_LEN: usize = 20;
pub const MAX_MESSAGE_LEN: usize = 1000;
pub const MIN_HANDLE_LEN: usize = 3;
pub const MAX_HANDLE_LEN: usize = 20;

lazy_static! {
    /// Local part, `@`, then dot-separated domain labels ending in a TLD.
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,}$"
    ).unwrap();

    static ref HANDLE_REGEX: Regex = Regex::new(r"^[A-Za-z0-9]+$").unwrap();
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn validate_email(email: &str) -> ApiResult<()> {
    if email.len() > 254 || !EMAIL_REGEX.is_match(email) {
        return Err(ApiError::bad_request(format!("'{email}' is not a valid email")));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> ApiResult<()> {
    if char_len(password) < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_names(name_first: &str, name_last: &str) -> ApiResult<()> {
    for (label, name) in [("first", name_first), ("last", name_last)] {
        let len = char_len(name);
        if len < 1 || len > MAX_NAME_LEN {
            return Err(ApiError::bad_request(format!(
                "{label} name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
    }
    Ok(())
}

pub fn validate_channel_name(name: &str) -> ApiResult<()> {
    let len = char_len(name);
    if len < 1 || len > MAX_CHANNEL_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "channel name must be between 1 and {MAX_CHANNEL_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// Text of a message being sent: 1 to 1000 characters.
pub fn validate_message(text: &str) -> ApiResult<()> {
    let len = char_len(text);
    if len < 1 || len > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "message must be between 1 and {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

/// Text that may be empty (edits, share comments, standup lines).
pub fn validate_optional_message(text: &str) -> ApiResult<()> {
    if char_len(text) > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "message must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}

pub fn validate_handle(handle: &str) -> ApiResult<()> {
    let len = char_len(handle);
    if len < MIN_HANDLE_LEN || len > MAX_HANDLE_LEN {
        return Err(ApiError::bad_request(format!(
            "handle must be between {MIN_HANDLE_LEN} and {MAX_HANDLE_LEN} characters"
        )));
    }
    if !HANDLE_REGEX.is_match(handle) {
        return Err(ApiError::bad_request("handle must be alphanumeric"));
    }
    Ok(())
}

pub fn validate_query(query: &str) -> ApiResult<()> {
    let len = char_len(query);
    if len < 1 || len > MAX_MESSAGE_LEN {
        return Err(ApiError::bad_request(format!(
            "query must be between 1 and {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(())
}
