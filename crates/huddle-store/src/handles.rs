/// Longest handle derived from a name, before any collision suffix.
pub const MAX_DERIVED_HANDLE: usize = 20;

/// Lowercased ASCII alphanumerics of `first` followed by `last`, cut to
/// [`MAX_DERIVED_HANDLE`] characters.
pub fn base_handle(first: &str, last: &str) -> String {
    first
        .chars()
        .chain(last.chars())
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_DERIVED_HANDLE)
        .collect()
}

/// `base` itself if free, otherwise `base` followed by the smallest
/// non-negative integer that is free.
pub fn unique_handle(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }

    let mut suffix: u64 = 0;
    loop {
        let candidate = format!("{base}{suffix}");
        if !is_taken(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
