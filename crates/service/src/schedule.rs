//! When a scheduled refresh should run.

use std::time::Duration as StdDuration;
use time::{Duration, UtcDateTime};

/// Periodic refresh settings.
///
/// Manual imports ignore the schedule entirely; it only gates imports
/// triggered in the background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    pub enabled: bool,
    pub interval: Duration,
}
impl Default for Schedule {
    /// Enabled, weekly.
    fn default() -> Self {
        Self { enabled: true, interval: Duration::weeks(1) }
    }
}
impl Schedule {
    pub fn new(enabled: bool, interval: StdDuration) -> Self {
        Self {
            enabled,
            interval: Duration::try_from(interval).unwrap_or(Duration::MAX),
        }
    }

    /// A disabled schedule is never due, a schedule with no previous import
    /// always is. Otherwise the interval must have elapsed since the last
    /// import.
    pub fn is_due(&self, last_imported: Option<UtcDateTime>, now: UtcDateTime) -> bool {
        if !self.enabled {
            return false;
        }
        match last_imported {
            None => true,
            Some(last) => now - last >= self.interval,
        }
    }
}
