use slug::slugify;

pub const GROUP_SLUG_MAX_LENGTH: usize = 100;

/// Lowercase, transliterated, hyphen-separated slug for `title`, cut to at
/// most `max_len` characters.
pub fn generate_slug(title: &str, max_len: usize) -> String {
    // slugify output is ASCII, so char and byte boundaries coincide
    slugify(title).chars().take(max_len).collect()
}

pub fn validate_slug(slug: &str) -> bool {
    if slug.is_empty() || slug.len() > GROUP_SLUG_MAX_LENGTH {
        return false;
    }
    slug.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
