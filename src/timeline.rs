//! Event-count histogram over record timestamps.
//!
//! The viewer draws the output as a sparkline above the list; everything here is plain data so
//! it can be tested without a terminal.

use crate::record::LogRecord;
use chrono::DateTime;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub min: f64,
    pub max: f64,
}

/// Half-open `[start, end)` interval in epoch milliseconds. The last bucket also holds `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeBucket {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketCount {
    pub bucket: TimeBucket,
    pub count: u64,
}

/// Earliest and latest timestamps, or `None` for an empty slice.
pub fn time_range(records: &[Arc<LogRecord>]) -> Option<TimeRange> {
    records.iter().map(|r| r.timestamp_ms()).fold(None, |range, t| {
        Some(match range {
            None => TimeRange { min: t, max: t },
            Some(TimeRange { min, max }) => TimeRange {
                min: min.min(t),
                max: max.max(t),
            },
        })
    })
}

/// Split `[min, max]` into `count` equal buckets. A zero-width range is widened to 1ms.
pub fn create_buckets(min: f64, max: f64, count: usize) -> Vec<TimeBucket> {
    if count == 0 {
        return Vec::new();
    }
    let width = (max - min).max(1.0) / count as f64;
    (0..count)
        .map(|i| {
            let start = min + width * i as f64;
            TimeBucket {
                start,
                end: start + width,
            }
        })
        .collect()
}

/// Count records per bucket. Timestamps outside the buckets' span are ignored.
pub fn assign_to_buckets(records: &[Arc<LogRecord>], buckets: &[TimeBucket]) -> Vec<BucketCount> {
    let mut counts: Vec<BucketCount> = buckets
        .iter()
        .map(|&bucket| BucketCount { bucket, count: 0 })
        .collect();
    let (Some(first), Some(last)) = (buckets.first(), buckets.last()) else {
        return counts;
    };
    let width = first.end - first.start;

    for time in records.iter().map(|r| r.timestamp_ms()) {
        if time < first.start || time > last.end || width <= 0.0 {
            continue;
        }
        let slot = (((time - first.start) / width) as usize).min(counts.len() - 1);
        counts[slot].count += 1;
    }
    counts
}

/// Evenly spaced axis labels from 0 covering `max`, using 1/2/5 steps.
///
/// At most `tick_count` intervals; `[0]` when `max` is 0.
pub fn y_axis_ticks(max: u64, tick_count: usize) -> Vec<u64> {
    if max == 0 || tick_count < 2 {
        return vec![0];
    }
    let rough = max as f64 / (tick_count - 1) as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let normalized = rough / magnitude;
    let nice = if normalized <= 1.0 {
        1.0
    } else if normalized <= 2.0 {
        2.0
    } else if normalized <= 5.0 {
        5.0
    } else {
        10.0
    };
    let step = ((nice * magnitude) as u64).max(1);
    let top = max.div_ceil(step) * step;
    (0..=top / step).map(|i| i * step).collect()
}

/// `HH:MM:SS` label for an axis position.
pub fn format_axis_time(ms: f64) -> String {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.format("%H:%M:%S").to_string())
        .unwrap_or_default()
}

/// Everything the timeline widget draws.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub buckets: Vec<BucketCount>,
    pub ticks: Vec<u64>,
}

impl Histogram {
    pub fn build(records: &[Arc<LogRecord>], bucket_count: usize) -> Option<Self> {
        let range = time_range(records)?;
        let buckets = assign_to_buckets(records, &create_buckets(range.min, range.max, bucket_count));
        let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
        Some(Self {
            buckets,
            ticks: y_axis_ticks(max, 5),
        })
    }

    pub fn counts(&self) -> Vec<u64> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    /// Largest tick, used as the chart's ceiling.
    pub fn ceiling(&self) -> u64 {
        self.ticks.last().copied().unwrap_or(0).max(1)
    }

    pub fn span(&self) -> Option<TimeRange> {
        Some(TimeRange {
            min: self.buckets.first()?.bucket.start,
            max: self.buckets.last()?.bucket.end,
        })
    }
}
