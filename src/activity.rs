use crate::parser::QueryRecord;
use chrono::{Datelike, Timelike};

pub const DAY_NAMES: [&str; 7] = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

/// Query counts per weekday (Sunday first) and hour of day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityGrid {
    counts: [[u64; 24]; 7],
}

impl ActivityGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, record: &QueryRecord) {
        let day = record.timestamp.weekday().num_days_from_sunday() as usize;
        let hour = record.timestamp.hour() as usize;
        self.counts[day][hour] += 1;
    }

    /// `day` counts from Sunday = 0.
    pub fn count(&self, day: usize, hour: usize) -> u64 {
        self.counts[day][hour]
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().flatten().all(|&c| c == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, hour: u32) -> QueryRecord {
        QueryRecord {
            timestamp: NaiveDate::from_ymd_opt(2013, 4, day).unwrap().and_hms_opt(hour, 10, 0).unwrap(),
            database: "db".to_string(),
            query_time: 1.0,
            lock_time: 0.0,
            rows_sent: 0,
            rows_examined: 0,
            statement: String::new(),
        }
    }

    #[test]
    fn test_grid_counts_by_weekday_and_hour() {
        let mut grid = ActivityGrid::new();
        assert!(grid.is_empty());

        // 2013-04-21 was a Sunday
        grid.observe(&record(21, 6));
        grid.observe(&record(21, 6));
        grid.observe(&record(22, 23));

        assert_eq!(grid.count(0, 6), 2);
        assert_eq!(grid.count(1, 23), 1);
        assert_eq!(grid.count(1, 6), 0);
        assert!(!grid.is_empty());
    }
}
