//! Field derivation for posts: slug, excerpt, and read time.
//!
//! Pure functions over the post's raw fields. Re-derivation is gated
//! on the title being part of a mutation; content-only edits leave
//! slug, excerpt, and read time untouched (see `post::update_post`).

use std::sync::LazyLock;

use regex::Regex;

/// Maximum length of a derived excerpt, before the ellipsis marker.
pub(crate) const EXCERPT_LEN: usize = 200;

/// Average reading speed used for the read-time estimate.
pub(crate) const WORDS_PER_MINUTE: usize = 200;

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern compiles"));

/// Derive a URL-safe slug from a title.
///
/// Lowercase, with every run of non-alphanumeric characters collapsed
/// to a single `-`. No leading or trailing separator. May come out
/// empty for titles with no alphanumeric characters at all; callers
/// must substitute a fallback before persisting.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    if slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Derive an excerpt from raw content: strip markup tags, keep the
/// first [`EXCERPT_LEN`] characters, append an ellipsis marker.
pub fn derive_excerpt(content: &str) -> String {
    let plain = MARKUP_TAG.replace_all(content, "");
    let mut excerpt: String = plain.chars().take(EXCERPT_LEN).collect();
    excerpt.push_str("...");
    excerpt
}

/// Estimate reading time in minutes: whitespace-separated word count
/// at [`WORDS_PER_MINUTE`], rounded up, never below 1.
pub fn estimate_read_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

/// Normalize a tag list: trim, lowercase, drop empties, keep the
/// first occurrence of each tag.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let t = tag.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
