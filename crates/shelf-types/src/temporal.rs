use chrono::{DateTime, FixedOffset, Local};

use crate::error::TypeError;

/// Timezone-aware instant used for every checkout date.
///
/// The offset is significant: "local time" rules such as the reservation
/// cutoff are evaluated in the offset the timestamp carries.
pub type Timestamp = DateTime<FixedOffset>;

/// Parse an RFC 3339 timestamp such as `2024-03-01T10:00:00+01:00`.
pub fn parse_timestamp(s: &str) -> Result<Timestamp, TypeError> {
    DateTime::parse_from_rfc3339(s).map_err(|e| TypeError::InvalidTimestamp(e.to_string()))
}

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock in the host's local offset.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Local::now().fixed_offset()
    }
}

/// A clock pinned to one instant, for replaying a past day.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    now: Timestamp,
}

impl FixedClock {
    pub fn new(now: Timestamp) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.now
    }
}
