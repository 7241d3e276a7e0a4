//! Local wall-clock capability.
//!
//! The engine never reads the system clock directly; it asks a [`Clock`] so
//! tests can pin "now" and shrink timer waits.

use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone};
use std::time::Duration;

/// Longest DST gap searched when a wall time does not exist.
const MAX_GAP_MINUTES: i64 = 180;

/// Source of local wall-clock time and timer distances.
pub trait Clock: Send + Sync {
    /// Current local date-time without zone information.
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Real time to wait until local wall-clock `target` is reached.
    ///
    /// Returns zero when `target` is already in the past.
    fn duration_until(&self, target: NaiveDateTime) -> Duration;
}

/// [`Clock`] backed by the operating system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn duration_until(&self, target: NaiveDateTime) -> Duration {
        let Some(deadline) = resolve_local(target) else {
            return Duration::ZERO;
        };
        (deadline - Local::now()).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Maps a local wall-clock time onto a concrete instant.
///
/// Ambiguous times (clocks turned back) take the earlier instant. Times that
/// do not exist (clocks sprung forward) move to the first minute after the
/// gap.
fn resolve_local(target: NaiveDateTime) -> Option<DateTime<Local>> {
    resolve_wall_time(target, |local| Local.from_local_datetime(local))
}

/// Zone-independent core of [`resolve_local`]; `lookup` maps a wall time to
/// the instants it denotes.
fn resolve_wall_time<T>(
    target: NaiveDateTime,
    lookup: impl Fn(&NaiveDateTime) -> LocalResult<T>,
) -> Option<T> {
    match lookup(&target) {
        LocalResult::Single(instant) => Some(instant),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .filter_map(|minutes| {
                let shifted = target.checked_add_signed(chrono::Duration::minutes(minutes))?;
                lookup(&shifted).earliest()
            })
            .next(),
    }
}
