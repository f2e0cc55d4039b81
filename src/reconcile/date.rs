// src/reconcile/date.rs
use std::collections::HashMap;

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, NaiveTime,
    Timelike,
};
use tracing::warn;

use crate::model::{BucketedResult, DateUnit};
use crate::reconcile::{assemble, CategoricalAxis, ReconciledAxis};

/// Format of date bucket keys, e.g. `2024-03-01T00:00:00.000+0100`.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Calendar buckets between the earliest and latest bucket start.
///
/// With a fixed unit the axis uses it directly. Without one, each member's
/// unit is inferred from its own keys (the coarsest unit its keys are
/// aligned to and still distinct under) and the finest of those wins, so
/// no member loses resolution.
///
/// Keys are bucketed on their own wall clock, so a zone moving from `+0100`
/// to `+0200` still puts `2024-04-01T00:00+0200` in April. Each axis key
/// carries the offset of the first member key in its bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateAxis {
    unit: Option<DateUnit>,
    bucket_limit: usize,
}

impl DateAxis {
    pub fn new(bucket_limit: usize) -> Self {
        Self {
            unit: None,
            bucket_limit,
        }
    }

    /// Fix the axis unit. `Automatic` or `None` infers it from the keys.
    pub fn with_unit(mut self, unit: Option<DateUnit>) -> Self {
        self.unit = unit.filter(|u| *u != DateUnit::Automatic);
        self
    }

    pub fn reconcile(&self, results: &[BucketedResult]) -> ReconciledAxis {
        let Some(members) = parse_members(results) else {
            warn!("unparsable date bucket keys, reconciling as categories");
            return CategoricalAxis::new(self.bucket_limit).reconcile(results);
        };

        let unit = self.unit.unwrap_or_else(|| {
            members
                .iter()
                .filter(|dates| !dates.is_empty())
                .map(|dates| infer_unit(dates))
                .min()
                .unwrap_or(DateUnit::Day)
        });

        // Bucket starts on each key's own wall clock; offsets differ across DST.
        let starts: Vec<Vec<Option<NaiveDateTime>>> = members
            .iter()
            .map(|dates| {
                dates
                    .iter()
                    .map(|d| truncate_date(d.naive_local(), unit))
                    .collect()
            })
            .collect();

        let mut offsets: HashMap<NaiveDateTime, FixedOffset> = HashMap::new();
        for (start, date) in starts.iter().flatten().zip(members.iter().flatten()) {
            if let Some(start) = start {
                offsets.entry(*start).or_insert(*date.offset());
            }
        }
        let (Some(first), Some(last)) = (offsets.keys().min(), offsets.keys().max()) else {
            return ReconciledAxis::empty(results);
        };
        let Some(mut offset) = offsets.get(first).copied() else {
            return ReconciledAxis::empty(results);
        };

        let mut slots = Vec::new();
        let mut keys = Vec::new();
        let mut truncated = false;
        let mut index = 0u32;
        while let Some(slot) = advance_date(*first, unit, index) {
            if slot > *last {
                break;
            }
            if slots.len() == self.bucket_limit {
                truncated = true;
                break;
            }
            // Empty buckets take the offset of the bucket before them.
            offset = offsets.get(&slot).copied().unwrap_or(offset);
            let Some(key) = format_date_key(slot, offset) else {
                truncated = true;
                break;
            };
            slots.push(slot);
            keys.push(key);
            index += 1;
        }

        let positions: HashMap<NaiveDateTime, usize> =
            slots.iter().enumerate().map(|(i, s)| (*s, i)).collect();

        let placements = results
            .iter()
            .zip(&starts)
            .map(|(result, starts)| {
                result
                    .entries
                    .iter()
                    .zip(starts)
                    .filter_map(|(entry, start)| {
                        positions.get(start.as_ref()?).map(|slot| (*slot, entry.value))
                    })
                    .collect()
            })
            .collect();

        assemble(results, keys, placements, truncated)
    }
}

fn parse_members(results: &[BucketedResult]) -> Option<Vec<Vec<DateTime<FixedOffset>>>> {
    results
        .iter()
        .map(|r| r.entries.iter().map(|e| parse_key(&e.key)).collect())
        .collect()
}

fn parse_key(key: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(key, DATE_KEY_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(key))
        .ok()
}

/// Key for a bucket start read on the wall clock of `offset`.
pub(crate) fn format_date_key(slot: NaiveDateTime, offset: FixedOffset) -> Option<String> {
    let utc = slot.checked_sub_offset(offset)?;
    let date = DateTime::<FixedOffset>::from_naive_utc_and_offset(utc, offset);
    Some(date.format(DATE_KEY_FORMAT).to_string())
}

/// Coarsest unit the member's keys sit on bucket boundaries of and stay distinct under.
fn infer_unit(dates: &[DateTime<FixedOffset>]) -> DateUnit {
    let local: Vec<NaiveDateTime> = dates.iter().map(|d| d.naive_local()).collect();

    DateUnit::FIXED
        .iter()
        .rev()
        .copied()
        .find(|unit| {
            let mut seen = std::collections::HashSet::new();
            local.iter().all(|date| match truncate_date(*date, *unit) {
                Some(start) => start == *date && seen.insert(start),
                None => false,
            })
        })
        .unwrap_or(DateUnit::Minute)
}

/// Start of the bucket containing `date`. Weeks start on Monday.
///
/// `Automatic` is not a bucket width and leaves the date at minute precision.
pub(crate) fn truncate_date(date: NaiveDateTime, unit: DateUnit) -> Option<NaiveDateTime> {
    let day = date.date();
    let truncated = match unit {
        DateUnit::Automatic | DateUnit::Minute => {
            day.and_time(NaiveTime::from_hms_opt(date.hour(), date.minute(), 0)?)
        }
        DateUnit::Hour => day.and_time(NaiveTime::from_hms_opt(date.hour(), 0, 0)?),
        DateUnit::Day => day.and_time(NaiveTime::MIN),
        DateUnit::Week => {
            let monday = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
            monday.and_time(NaiveTime::MIN)
        }
        DateUnit::Month => NaiveDate::from_ymd_opt(day.year(), day.month(), 1)?.and_time(NaiveTime::MIN),
        DateUnit::Quarter => {
            let month = (day.month0() / 3) * 3 + 1;
            NaiveDate::from_ymd_opt(day.year(), month, 1)?.and_time(NaiveTime::MIN)
        }
        DateUnit::Year => NaiveDate::from_ymd_opt(day.year(), 1, 1)?.and_time(NaiveTime::MIN),
    };
    Some(truncated)
}

/// `start` moved forward by `count` buckets of `unit`.
pub(crate) fn advance_date(start: NaiveDateTime, unit: DateUnit, count: u32) -> Option<NaiveDateTime> {
    let n = i64::from(count);
    match unit {
        DateUnit::Automatic | DateUnit::Minute => start.checked_add_signed(Duration::minutes(n)),
        DateUnit::Hour => start.checked_add_signed(Duration::hours(n)),
        DateUnit::Day => start.checked_add_signed(Duration::days(n)),
        DateUnit::Week => start.checked_add_signed(Duration::weeks(n)),
        DateUnit::Month => start.checked_add_months(Months::new(count)),
        DateUnit::Quarter => start.checked_add_months(Months::new(count.checked_mul(3)?)),
        DateUnit::Year => start.checked_add_months(Months::new(count.checked_mul(12)?)),
    }
}
