/// Longest slug kept from a PR title.
pub const SLUG_MAX_LEN: usize = 24;

/// Slug used when nothing usable survives from the title.
pub const EMPTY_SLUG: &str = "untitled";

/// Derive the human-readable identifier used in directory and tag names.
///
/// The title is lowercased, every run of characters outside `[a-z0-9]`
/// becomes a single `_`, the result is cut to [`SLUG_MAX_LEN`] characters and
/// stripped of leading/trailing `_`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut in_gap = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch);
            in_gap = false;
        } else if !in_gap {
            slug.push('_');
            in_gap = true;
        }
    }

    // Only ASCII was pushed, so byte truncation is a char boundary.
    slug.truncate(SLUG_MAX_LEN);

    match slug.trim_matches('_') {
        "" => EMPTY_SLUG.to_string(),
        trimmed => trimmed.to_string(),
    }
}
