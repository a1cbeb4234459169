//! Typed ID wrappers for the entities threaded through the runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed IDs are plain strings underneath — no UUID enforcement, no format
/// requirement. They exist so a `TaskId` can't be passed where a `ProjectId`
/// is expected.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new typed ID from anything that converts to String.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(TaskId, "Unique identifier for a TaskSpec within a plan.");
typed_id!(PlanId, "Unique identifier for a Plan.");
typed_id!(ProjectId, "Unique identifier for a Project.");
typed_id!(SessionId, "Unique identifier for a CLI/API session.");
typed_id!(ScheduledItemId, "Unique identifier for a ScheduledItem.");
typed_id!(ConversationId, "Unique identifier for a persisted Conversation row.");
typed_id!(ImprovementAttemptId, "Unique identifier for an ImprovementAttempt.");
typed_id!(ErrorRecordId, "Unique identifier for an in-memory ErrorRecord.");
