use crate::parser::QueryRecord;
use chrono::{NaiveDateTime, Timelike};
use std::collections::HashMap;

/// Queries that fall into one clock hour.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    /// Start of the hour (minutes and seconds zeroed).
    pub hour: NaiveDateTime,
    pub count: usize,
    /// Positions of the member records in the order they were observed.
    pub records: Vec<usize>,
}

/// Hour buckets of one file, ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotSeries {
    pub name: String,
    /// In first-seen order, not sorted by time.
    pub buckets: Vec<Bucket>,
    pub x_min: Option<NaiveDateTime>,
    pub x_max: Option<NaiveDateTime>,
    pub y_min: usize,
    pub y_max: usize,
}

impl PlotSeries {
    pub fn total(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

pub fn hour_of(timestamp: NaiveDateTime) -> NaiveDateTime {
    timestamp
        .date()
        .and_hms_opt(timestamp.hour(), 0, 0)
        .unwrap_or(timestamp)
}

/// Groups one file's records by hour.
#[derive(Debug)]
pub struct TimeBucketAggregator {
    name: String,
    buckets: Vec<Bucket>,
    slots: HashMap<NaiveDateTime, usize>,
    observed: usize,
    x_min: Option<NaiveDateTime>,
    x_max: Option<NaiveDateTime>,
    y_min: usize,
    y_max: usize,
}

impl TimeBucketAggregator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buckets: Vec::new(),
            slots: HashMap::new(),
            observed: 0,
            x_min: None,
            x_max: None,
            y_min: 0,
            y_max: 0,
        }
    }

    pub fn observe(&mut self, record: &QueryRecord) {
        let hour = hour_of(record.timestamp);
        let slot = *self.slots.entry(hour).or_insert_with(|| {
            self.buckets.push(Bucket { hour, count: 0, records: Vec::new() });
            self.buckets.len() - 1
        });

        let bucket = &mut self.buckets[slot];
        bucket.count += 1;
        bucket.records.push(self.observed);
        self.observed += 1;

        self.y_max = self.y_max.max(bucket.count);
        self.y_min = self.y_min.min(bucket.count);
        if self.x_min.map_or(true, |x| hour < x) {
            self.x_min = Some(hour);
        }
        if self.x_max.map_or(true, |x| hour > x) {
            self.x_max = Some(hour);
        }
    }

    pub fn finalize(self) -> PlotSeries {
        PlotSeries {
            name: self.name,
            buckets: self.buckets,
            x_min: self.x_min,
            x_max: self.x_max,
            y_min: self.y_min,
            y_max: self.y_max,
        }
    }
}
