//! Key convention for conversations stored in a [`StateStore`](layer0::state::StateStore)
//! scope. Keys are lexicographically sortable by time so "last N" is a
//! plain `list` + sort + tail, with no secondary index.

use forge_types::Conversation;

const PREFIX: &str = "conversation:";

/// The key a [`Conversation`] is written under. Millisecond timestamp
/// first, zero-padded, so lexicographic string order matches chronological
/// order regardless of id.
pub fn key_for(conversation: &Conversation) -> String {
    format!("{PREFIX}{:020}:{}", conversation.ts.timestamp_millis(), conversation.id)
}

/// The prefix `StateStore::list` should be called with to enumerate
/// conversation keys in a scope.
pub fn list_prefix() -> &'static str {
    PREFIX
}

/// Sort keys returned by `list` chronologically and keep only the last `n`.
/// Relies on the zero-padded timestamp prefix making string order match
/// time order.
pub fn most_recent(mut keys: Vec<String>, n: usize) -> Vec<String> {
    keys.sort();
    if keys.len() > n {
        keys.split_off(keys.len() - n)
    } else {
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn conv_at(id: &str, millis: i64) -> Conversation {
        Conversation::new(
            layer0::id::ConversationId::new(id),
            Utc.timestamp_millis_opt(millis).unwrap(),
            id.to_string(),
            "reply".to_string(),
            serde_json::json!({}),
        )
    }

    #[test]
    fn keys_sort_chronologically_regardless_of_id() {
        let early = conv_at("zzz", 1_000);
        let late = conv_at("aaa", 2_000);
        let mut keys = vec![key_for(&late), key_for(&early)];
        keys.sort();
        assert!(keys[0].contains("zzz"));
        assert!(keys[1].contains("aaa"));
    }

    #[test]
    fn most_recent_truncates_and_sorts() {
        let keys = vec![
            key_for(&conv_at("c", 3_000)),
            key_for(&conv_at("a", 1_000)),
            key_for(&conv_at("b", 2_000)),
        ];
        let kept = most_recent(keys, 2);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].contains("b"));
        assert!(kept[1].contains("c"));
    }

    #[test]
    fn most_recent_keeps_all_when_under_limit() {
        let keys = vec![key_for(&conv_at("a", 1_000))];
        assert_eq!(most_recent(keys, 5).len(), 1);
    }
}
