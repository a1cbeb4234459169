//! The `#<slug>` project-mention scan (spec.md §4.6 step 2): a user
//! request may name a project to switch into before the rest of the
//! pipeline runs.

use regex::Regex;
use std::sync::OnceLock;

fn pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?:^|\s)#([a-z0-9][a-z0-9-]*)").expect("static pattern is valid"))
}

/// If `input` contains a `#<slug>` mention, return the slug and `input`
/// with the mention (and any leading whitespace it consumed) removed and
/// the remainder trimmed. `None` if no mention is present.
pub fn extract(input: &str) -> Option<(String, String)> {
    let captures = pattern().captures(input)?;
    let whole = captures.get(0).expect("capture 0 always matches");
    let slug = captures[1].to_string();
    let mut stripped = String::with_capacity(input.len());
    stripped.push_str(&input[..whole.start()]);
    stripped.push_str(&input[whole.end()..]);
    Some((slug, stripped.trim().to_string()))
}
