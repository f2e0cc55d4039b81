// src/reconcile/numeric.rs
use tracing::warn;

use crate::model::{BucketedResult, CustomBucket};
use crate::reconcile::{assemble, CategoricalAxis, ReconciledAxis};

const EPSILON: f64 = 1e-9;

/// Fixed-width numeric buckets for duration and numeric variable groupings.
///
/// The axis starts at the power-of-ten floor of the smallest key (or the
/// custom baseline, when it lies below every key) and runs up to the
/// largest key. The bucket width is the custom bucket size if one is active,
/// otherwise the tightest key spacing any member shows.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericAxis {
    bucket: Option<(Option<f64>, Option<f64>)>,
    bucket_limit: usize,
}

impl NumericAxis {
    pub fn new(bucket_limit: usize) -> Self {
        Self {
            bucket: None,
            bucket_limit,
        }
    }

    pub fn with_custom_bucket(mut self, bucket: CustomBucket) -> Self {
        self.bucket = bucket.effective();
        self
    }

    pub fn reconcile(&self, results: &[BucketedResult]) -> ReconciledAxis {
        let Some(members) = parse_members(results) else {
            warn!("non-numeric bucket keys, reconciling as categories");
            return CategoricalAxis::new(self.bucket_limit).reconcile(results);
        };

        let all: Vec<f64> = members.iter().flatten().copied().collect();
        if all.is_empty() {
            return ReconciledAxis::empty(results);
        }
        let min = all.iter().copied().fold(f64::INFINITY, f64::min);
        let max = all.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let baseline = self.baseline(min);
        let step = self.step(&members, &all, baseline);

        let span = ((max - baseline) / step + EPSILON).floor() + 1.0;
        let truncated = span > self.bucket_limit as f64;
        let count = if truncated {
            self.bucket_limit
        } else {
            span as usize
        };

        let integral = all.iter().all(|v| v.fract() == 0.0);
        let mut originals: Vec<Option<&str>> = vec![None; count];
        let mut placements = Vec::with_capacity(results.len());

        for (result, values) in results.iter().zip(&members) {
            let mut placed = Vec::with_capacity(values.len());
            for (entry, value) in result.entries.iter().zip(values) {
                let slot = ((value - baseline) / step + EPSILON).floor() as usize;
                if slot >= count {
                    continue;
                }
                let slot_value = tidy(baseline + slot as f64 * step);
                if originals[slot].is_none() && (slot_value - value).abs() <= EPSILON * value.abs().max(1.0) {
                    originals[slot] = Some(entry.key.as_str());
                }
                placed.push((slot, entry.value));
            }
            placements.push(placed);
        }

        let keys = originals
            .iter()
            .enumerate()
            .map(|(slot, original)| match original {
                Some(key) => key.to_string(),
                None => format_key(tidy(baseline + slot as f64 * step), integral),
            })
            .collect();

        assemble(results, keys, placements, truncated)
    }

    fn baseline(&self, min: f64) -> f64 {
        match self.bucket {
            Some((_, Some(baseline))) if baseline <= min => baseline,
            _ => floor_power_of_ten(min),
        }
    }

    fn step(&self, members: &[Vec<f64>], all: &[f64], baseline: f64) -> f64 {
        if let Some((Some(size), _)) = self.bucket {
            if size > 0.0 {
                return size;
            }
        }

        let gap = members
            .iter()
            .filter_map(|values| min_gap(values))
            .reduce(f64::min)
            .or_else(|| min_gap(all));

        match gap {
            Some(gap) if is_aligned(all, baseline, gap) => gap,
            Some(gap) => floor_power_of_ten(gap),
            None => {
                let single = floor_power_of_ten(all[0].abs());
                if single > 0.0 {
                    single
                } else {
                    1.0
                }
            }
        }
    }
}

fn parse_members(results: &[BucketedResult]) -> Option<Vec<Vec<f64>>> {
    results
        .iter()
        .map(|r| {
            r.entries
                .iter()
                .map(|e| e.key.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
                .collect()
        })
        .collect()
}

/// Smallest distance between distinct values, if there are two of them.
fn min_gap(values: &[f64]) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|gap| *gap > EPSILON)
        .reduce(f64::min)
}

fn is_aligned(values: &[f64], baseline: f64, step: f64) -> bool {
    values.iter().all(|v| {
        let offset = (v - baseline) / step;
        (offset - offset.round()).abs() <= EPSILON * offset.abs().max(1.0)
    })
}

/// Nearest power of ten at or below `value`.
///
/// Negative values floor away from zero (`-35` gives `-100`); zero stays zero.
pub(crate) fn floor_power_of_ten(value: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return 0.0;
    }
    if value < 0.0 {
        let magnitude = value.abs();
        let mut power = 10f64.powi(magnitude.log10().ceil() as i32);
        if power / 10.0 >= magnitude {
            power /= 10.0;
        }
        return -power;
    }
    let mut power = 10f64.powi(value.log10().floor() as i32);
    if power * 10.0 <= value {
        power *= 10.0;
    }
    if power > value {
        power /= 10.0;
    }
    power
}

fn tidy(value: f64) -> f64 {
    let rounded = (value * 1e9).round() / 1e9;
    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

fn format_key(value: f64, integral: bool) -> String {
    if integral && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        ryu::Buffer::new().format(value).to_string()
    }
}
