use crate::parser::QueryRecord;

/// Smallest and largest value seen for one field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy> Bounds<T> {
    fn seed(value: T) -> Self {
        Self { min: value, max: value }
    }

    fn widen(&mut self, value: T) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }
}

fn fold<T: PartialOrd + Copy>(slot: &mut Option<Bounds<T>>, value: T) {
    match slot {
        Some(bounds) => bounds.widen(value),
        None => *slot = Some(Bounds::seed(value)),
    }
}

/// Min/max of every numeric field over all observed records.
///
/// All four bounds are `None` until the first record arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningStats {
    pub records: u64,
    pub query_time: Option<Bounds<f64>>,
    pub lock_time: Option<Bounds<f64>>,
    pub rows_sent: Option<Bounds<u64>>,
    pub rows_examined: Option<Bounds<u64>>,
}

/// Accumulates `RunningStats` without keeping the records themselves.
#[derive(Debug, Default)]
pub struct StatsTracker {
    stats: RunningStats,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &QueryRecord) {
        let stats = &mut self.stats;
        stats.records += 1;
        fold(&mut stats.query_time, record.query_time);
        fold(&mut stats.lock_time, record.lock_time);
        fold(&mut stats.rows_sent, record.rows_sent);
        fold(&mut stats.rows_examined, record.rows_examined);
    }

    pub fn snapshot(&self) -> RunningStats {
        self.stats.clone()
    }

    pub fn reset(&mut self) {
        self.stats = RunningStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(query_time: f64, lock_time: f64, rows_sent: u64, rows_examined: u64) -> QueryRecord {
        QueryRecord {
            timestamp: NaiveDate::from_ymd_opt(2013, 4, 21).unwrap().and_hms_opt(6, 45, 32).unwrap(),
            database: "db".to_string(),
            query_time,
            lock_time,
            rows_sent,
            rows_examined,
            statement: "SELECT 1;".to_string(),
        }
    }

    #[test]
    fn test_empty_tracker() {
        let stats = StatsTracker::new().snapshot();
        assert_eq!(stats.records, 0);
        assert!(stats.query_time.is_none());
        assert!(stats.rows_examined.is_none());
    }

    #[test]
    fn test_first_record_seeds_both_bounds() {
        let mut tracker = StatsTracker::new();
        tracker.observe(&record(7.0, 0.5, 3, 100));
        let stats = tracker.snapshot();

        assert_eq!(stats.query_time, Some(Bounds { min: 7.0, max: 7.0 }));
        assert_eq!(stats.lock_time, Some(Bounds { min: 0.5, max: 0.5 }));
        assert_eq!(stats.rows_sent, Some(Bounds { min: 3, max: 3 }));
        assert_eq!(stats.rows_examined, Some(Bounds { min: 100, max: 100 }));
    }

    #[test]
    fn test_bounds_only_widen() {
        let records = [
            record(2.0, 0.1, 10, 500),
            record(9.5, 0.0, 0, 20),
            record(4.0, 0.3, 7, 70_000),
            record(1.2, 0.05, 3, 1),
            record(3.3, 0.2, 12, 900),
        ];
        let mut tracker = StatsTracker::new();
        let mut previous: Option<RunningStats> = None;

        for (i, r) in records.iter().enumerate() {
            tracker.observe(r);
            let stats = tracker.snapshot();
            let qt = stats.query_time.unwrap();
            let rs = stats.rows_sent.unwrap();
            let re = stats.rows_examined.unwrap();

            for seen in &records[..=i] {
                assert!(qt.min <= seen.query_time && seen.query_time <= qt.max);
                assert!(rs.min <= seen.rows_sent && seen.rows_sent <= rs.max);
                assert!(re.min <= seen.rows_examined && seen.rows_examined <= re.max);
            }
            if let Some(prev) = previous {
                let prev_qt = prev.query_time.unwrap();
                assert!(qt.min <= prev_qt.min && qt.max >= prev_qt.max);
                let prev_lt = prev.lock_time.unwrap();
                let lt = stats.lock_time.unwrap();
                assert!(lt.min <= prev_lt.min && lt.max >= prev_lt.max);
            }
            previous = Some(stats);
        }

        let stats = tracker.snapshot();
        assert_eq!(stats.records, 5);
        assert_eq!(stats.query_time, Some(Bounds { min: 1.2, max: 9.5 }));
        assert_eq!(stats.rows_examined, Some(Bounds { min: 1, max: 70_000 }));
    }

    #[test]
    fn test_reset() {
        let mut tracker = StatsTracker::new();
        tracker.observe(&record(1.0, 0.0, 0, 0));
        tracker.reset();
        assert_eq!(tracker.snapshot(), RunningStats::default());
    }
}
