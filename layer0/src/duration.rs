//! Millisecond duration newtype for wire-friendly serialization.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A duration serialized as a plain integer count of milliseconds rather
/// than `std::time::Duration`'s `{secs, nanos}` struct — easier for the
/// external store/API consumers to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationMs(pub u64);

impl DurationMs {
    /// Build from a `std::time::Duration`, truncating sub-millisecond precision.
    pub fn from_duration(d: Duration) -> Self {
        Self(d.as_millis() as u64)
    }

    /// Convert back to a `std::time::Duration`.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }
}

impl From<Duration> for DurationMs {
    fn from(d: Duration) -> Self {
        Self::from_duration(d)
    }
}

impl From<DurationMs> for Duration {
    fn from(d: DurationMs) -> Self {
        d.as_duration()
    }
}
