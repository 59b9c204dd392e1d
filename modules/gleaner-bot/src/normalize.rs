/// Direct-address salutations the community prepends to question titles.
const SALUTATIONS: &[&str] = &["reddit,", "redditors,", "reddit:"];

/// Moderator content tags, in both bracket styles.
const CONTENT_TAGS: &[&str] = &["[serious]", "(serious)", "[nsfw]", "(nsfw)"];

/// Canonicalize a question title for search and similarity comparison:
/// lower-case, drop salutation prefixes and leading/trailing content tags,
/// collapse whitespace. A tag in the middle of the title is content, not
/// boilerplate, and stays.
///
/// Runs to a fixpoint so stacked boilerplate like `"[Serious] Reddit, ..."`
/// strips completely and the function stays idempotent.
pub fn normalize_title(title: &str) -> String {
    let mut current = title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

/// One round of stripping. Each call either shortens the title or returns it
/// unchanged, so the fixpoint loop terminates.
fn strip_once(title: &str) -> String {
    let mut text = title.trim().to_string();
    for tag in CONTENT_TAGS {
        if let Some(rest) = text.strip_prefix(tag) {
            text = rest.trim_start().to_string();
        }
        if let Some(rest) = text.strip_suffix(tag) {
            text = rest.trim_end().to_string();
        }
    }
    for salutation in SALUTATIONS {
        if let Some(rest) = text.strip_prefix(salutation) {
            text = rest.trim_start().to_string();
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
