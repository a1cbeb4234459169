//! Key convention for the freeform `knowledge` key-value store the
//! improvement loop's counters and any tool writes accumulate into
//! (spec.md §4.6 step 3, §4.9 step 6).

const PREFIX: &str = "knowledge:";

/// The key a knowledge entry named `name` is stored under.
pub fn key_for(name: &str) -> String {
    format!("{PREFIX}{name}")
}

/// Strip the prefix back off a key returned by `StateStore::list`, for
/// display purposes.
pub fn strip_prefix(key: &str) -> &str {
    key.strip_prefix(PREFIX).unwrap_or(key)
}

/// The prefix `StateStore::list` should be called with to enumerate
/// knowledge keys in a scope.
pub fn list_prefix() -> &'static str {
    PREFIX
}
