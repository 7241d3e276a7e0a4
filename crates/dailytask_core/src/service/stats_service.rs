//! Task statistics aggregation.
//!
//! # Responsibility
//! - Turn task history into fixed-length `(total, completed)` series for the
//!   weekly, monthly and yearly reports.
//!
//! # Invariants
//! - Output length is exactly 7, 30 or 12 and every series has that length.
//! - Empty buckets are reported as zero, never omitted.
//! - `completed_tasks[i] <= total_tasks[i]`.
//! - Rows are matched to slots by structured [`BucketKey`]; display labels
//!   are produced only when the result is assembled.
//! - An unknown granularity is rejected before any store query.

use crate::clock::Clock;
use crate::repo::task_repo::{BucketCount, BucketKey, BucketUnit, RepoError, TaskRepository};
use chrono::{Datelike, Days, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Instant;

/// Reporting window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Last 7 days including today, one bucket per day.
    Weekly,
    /// Last 30 days including today, one bucket per day.
    Monthly,
    /// Last 12 months including the current one, one bucket per month.
    Yearly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Number of buckets in the series.
    pub fn bucket_count(self) -> usize {
        match self {
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Yearly => 12,
        }
    }

    fn unit(self) -> BucketUnit {
        match self {
            Self::Weekly | Self::Monthly => BucketUnit::Day,
            Self::Yearly => BucketUnit::Month,
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(StatsError::InvalidGranularity(value.to_string())),
        }
    }
}

/// Fixed-length statistics series, aligned by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStatistics {
    pub labels: Vec<String>,
    pub total_tasks: Vec<u32>,
    pub completed_tasks: Vec<u32>,
}

/// Errors from statistics requests.
#[derive(Debug)]
pub enum StatsError {
    /// Requested granularity is not weekly, monthly or yearly.
    InvalidGranularity(String),
    /// The reporting window falls outside the representable calendar.
    DateOutOfRange(NaiveDate),
    /// Persistence-layer failure.
    Store(RepoError),
}

impl Display for StatsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidGranularity(value) => write!(
                f,
                "invalid statistics granularity `{value}`; expected weekly|monthly|yearly"
            ),
            Self::DateOutOfRange(date) => {
                write!(f, "statistics window around {date} is out of range")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StatsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StatsError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

/// Statistics service over a repository and a clock.
pub struct StatisticsService<R: TaskRepository, C: Clock> {
    repo: R,
    clock: C,
}

impl<R: TaskRepository, C: Clock> StatisticsService<R, C> {
    pub fn new(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Parses `granularity` and computes the matching series.
    ///
    /// Fails with `InvalidGranularity` without querying the store when the
    /// name is unknown.
    pub fn statistics_for(&self, granularity: &str) -> Result<TaskStatistics, StatsError> {
        let granularity = granularity.parse::<Granularity>().inspect_err(|err| {
            warn!("event=stats_query module=stats status=error error_code=invalid_granularity error={err}");
        })?;
        self.statistics(granularity)
    }

    /// Computes the series ending at the clock's current local date.
    pub fn statistics(&self, granularity: Granularity) -> Result<TaskStatistics, StatsError> {
        let started_at = Instant::now();
        let today = self.clock.today();
        let keys = bucket_keys(granularity, today)?;
        let (start, end) = window(granularity, today)?;
        let counts = self.repo.bucket_counts(granularity.unit(), start, end)?;
        let statistics = assemble(&keys, &counts);

        debug!(
            "event=stats_query module=stats status=ok granularity={granularity} start={start} end={end} rows={} duration_ms={}",
            counts.len(),
            started_at.elapsed().as_millis()
        );
        Ok(statistics)
    }
}

/// Chronological bucket keys for the window ending at `today`.
pub fn bucket_keys(
    granularity: Granularity,
    today: NaiveDate,
) -> Result<Vec<BucketKey>, StatsError> {
    let count = granularity.bucket_count();
    match granularity.unit() {
        BucketUnit::Day => (0..count)
            .rev()
            .map(|offset| {
                today
                    .checked_sub_days(Days::new(offset as u64))
                    .map(BucketKey::Day)
                    .ok_or(StatsError::DateOutOfRange(today))
            })
            .collect(),
        BucketUnit::Month => {
            let current = month_index(today);
            Ok((0..count as i32)
                .rev()
                .map(|offset| month_key(current - offset))
                .collect())
        }
    }
}

/// Display label for one bucket: `M/D/YYYY` for days, `Jan`..`Dec` for months.
pub fn bucket_label(key: BucketKey) -> String {
    match key {
        BucketKey::Day(date) => date.format("%-m/%-d/%Y").to_string(),
        BucketKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| first.format("%b").to_string())
            .unwrap_or_else(|| format!("{year}-{month:02}")),
    }
}

/// Inclusive `scheduled_date` window covered by the buckets.
fn window(
    granularity: Granularity,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), StatsError> {
    let out_of_range = || StatsError::DateOutOfRange(today);
    match granularity.unit() {
        BucketUnit::Day => {
            let span = granularity.bucket_count() as u64 - 1;
            let start = today
                .checked_sub_days(Days::new(span))
                .ok_or_else(out_of_range)?;
            Ok((start, today))
        }
        BucketUnit::Month => {
            let current = month_index(today);
            let start = first_day(current - (granularity.bucket_count() as i32 - 1))
                .ok_or_else(out_of_range)?;
            let end = first_day(current + 1)
                .and_then(|next_month| next_month.pred_opt())
                .ok_or_else(out_of_range)?;
            Ok((start, end))
        }
    }
}

fn assemble(keys: &[BucketKey], counts: &[BucketCount]) -> TaskStatistics {
    let by_key: HashMap<BucketKey, &BucketCount> =
        counts.iter().map(|count| (count.key, count)).collect();

    let mut statistics = TaskStatistics {
        labels: Vec::with_capacity(keys.len()),
        total_tasks: Vec::with_capacity(keys.len()),
        completed_tasks: Vec::with_capacity(keys.len()),
    };
    for key in keys {
        let (total, completed) = by_key
            .get(key)
            .map_or((0, 0), |count| (count.total, count.completed.min(count.total)));
        statistics.labels.push(bucket_label(*key));
        statistics.total_tasks.push(total);
        statistics.completed_tasks.push(completed);
    }
    statistics
}

/// Months since year 0, so month arithmetic is plain integer math.
fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}

fn month_key(index: i32) -> BucketKey {
    BucketKey::Month {
        year: index.div_euclid(12),
        month: index.rem_euclid(12) as u32 + 1,
    }
}

fn first_day(index: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(index.div_euclid(12), index.rem_euclid(12) as u32 + 1, 1)
}

#[cfg(test)]
mod tests {
    use super::{assemble, bucket_keys, bucket_label, window, Granularity, StatsError};
    use crate::repo::task_repo::{BucketCount, BucketKey};
    use chrono::NaiveDate;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn granularity_parses_known_names_only() {
        assert_eq!("weekly".parse::<Granularity>().unwrap(), Granularity::Weekly);
        assert_eq!("yearly".parse::<Granularity>().unwrap(), Granularity::Yearly);
        for name in ["daily", "Weekly", " yearly ", "MONTHLY", ""] {
            let err = name.parse::<Granularity>().unwrap_err();
            assert!(matches!(err, StatsError::InvalidGranularity(value) if value == name));
        }
    }

    #[test]
    fn weekly_keys_end_today_in_chronological_order() {
        let keys = bucket_keys(Granularity::Weekly, date(2024, 6, 10)).unwrap();
        assert_eq!(keys.len(), 7);
        assert_eq!(keys[0], BucketKey::Day(date(2024, 6, 4)));
        assert_eq!(keys[6], BucketKey::Day(date(2024, 6, 10)));
    }

    #[test]
    fn monthly_keys_cross_month_boundary() {
        let keys = bucket_keys(Granularity::Monthly, date(2024, 3, 5)).unwrap();
        assert_eq!(keys.len(), 30);
        // 2024 is a leap year.
        assert_eq!(keys[0], BucketKey::Day(date(2024, 2, 5)));
        assert_eq!(keys[29], BucketKey::Day(date(2024, 3, 5)));
    }

    #[test]
    fn yearly_keys_wrap_into_previous_year() {
        let keys = bucket_keys(Granularity::Yearly, date(2024, 3, 31)).unwrap();
        assert_eq!(keys.len(), 12);
        assert_eq!(keys[0], BucketKey::Month { year: 2023, month: 4 });
        assert_eq!(keys[11], BucketKey::Month { year: 2024, month: 3 });
    }

    #[test]
    fn yearly_window_covers_whole_months() {
        let (start, end) = window(Granularity::Yearly, date(2024, 12, 15)).unwrap();
        assert_eq!(start, date(2024, 1, 1));
        assert_eq!(end, date(2024, 12, 31));
    }

    #[test]
    fn labels_use_display_format() {
        assert_eq!(bucket_label(BucketKey::Day(date(2024, 6, 10))), "6/10/2024");
        assert_eq!(bucket_label(BucketKey::Month { year: 2024, month: 6 }), "Jun");
    }

    #[test]
    fn assemble_zero_fills_and_clamps_completed() {
        let keys = bucket_keys(Granularity::Weekly, date(2024, 6, 10)).unwrap();
        let counts = [
            BucketCount {
                key: BucketKey::Day(date(2024, 6, 10)),
                total: 2,
                completed: 1,
            },
            BucketCount {
                key: BucketKey::Day(date(2024, 6, 5)),
                total: 1,
                completed: 3,
            },
            // Outside the window; must be ignored.
            BucketCount {
                key: BucketKey::Day(date(2024, 6, 11)),
                total: 9,
                completed: 9,
            },
        ];

        let stats = assemble(&keys, &counts);
        assert_eq!(stats.total_tasks, vec![0, 1, 0, 0, 0, 0, 2]);
        assert_eq!(stats.completed_tasks, vec![0, 1, 0, 0, 0, 0, 1]);
        assert_eq!(stats.labels[6], "6/10/2024");
    }
}
