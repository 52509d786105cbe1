//! Daily regional means and the time-series chart built from them.

pub mod chart;
pub mod source;

use chrono::{Duration, NaiveDate};

pub use chart::{render_timeseries, ChartRenderer, PlottersChartRenderer};
pub use source::{ParquetSeriesSource, RasterSeriesSource, SeriesSource};

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub gas: String,
    /// Region identifier as resolved from the boundary layer.
    pub region: String,
    pub mean_value: f64,
}

/// The requested window and the points found inside it, ordered by date.
/// Days without a point are gaps.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub gas: String,
    pub region_name: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    pub fn new(
        gas: &str,
        region_name: &str,
        start: NaiveDate,
        end: NaiveDate,
        mut points: Vec<TimeSeriesPoint>,
    ) -> Self {
        points.retain(|p| p.date >= start && p.date <= end);
        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);

        TimeSeries {
            gas: gas.to_string(),
            region_name: region_name.to_string(),
            start,
            end,
            points,
        }
    }

    /// Number of days in the window.
    pub fn days(&self) -> u32 {
        ((self.end - self.start).num_days() + 1) as u32
    }

    /// Day index of `date` within the window.
    pub fn offset(&self, date: NaiveDate) -> i32 {
        (date - self.start).num_days() as i32
    }

    pub fn date_at(&self, offset: i32) -> NaiveDate {
        self.start + Duration::days(i64::from(offset))
    }

    /// Runs of points on consecutive days.
    pub fn segments(&self) -> Vec<&[TimeSeriesPoint]> {
        let mut segments = Vec::new();
        let mut start = 0;
        for i in 1..=self.points.len() {
            let broken = i == self.points.len()
                || self.points[i].date - self.points[i - 1].date != Duration::days(1);
            if broken {
                segments.push(&self.points[start..i]);
                start = i;
            }
        }

        segments
    }
}

/// First day of a `days`-long window ending on `end`, or `None` when the
/// window reaches past the calendar range.
pub fn window_start(end: NaiveDate, days: u32) -> Option<NaiveDate> {
    end.checked_sub_signed(Duration::days(i64::from(days.max(1)) - 1))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::date;

    fn point(day: &str, value: f64) -> TimeSeriesPoint {
        TimeSeriesPoint {
            date: date(day),
            gas: "CO".to_string(),
            region: "1".to_string(),
            mean_value: value,
        }
    }

    #[test]
    fn should_compute_window() {
        assert_eq!(window_start(date("2024-01-15"), 1), Some(date("2024-01-15")));
        assert_eq!(window_start(date("2024-01-15"), 30), Some(date("2023-12-17")));
    }

    #[test]
    fn should_reject_window_past_calendar_range() {
        assert_eq!(window_start(date("2024-01-15"), u32::MAX), None);
    }

    #[test]
    fn should_split_series_at_gaps() {
        let points = vec![
            point("2024-01-15", 3.0),
            point("2024-01-10", 1.0),
            point("2024-01-11", 2.0),
            point("2024-01-13", 2.5),
            point("2024-01-01", 9.0),
        ];

        let series = TimeSeries::new("CO", "North", date("2024-01-09"), date("2024-01-15"), points);

        assert_eq!(series.days(), 7);
        assert_eq!(series.points.len(), 4);
        assert_eq!(series.offset(date("2024-01-10")), 1);
        assert_eq!(series.date_at(6), date("2024-01-15"));

        let lengths: Vec<usize> = series.segments().iter().map(|s| s.len()).collect();
        assert_eq!(lengths, vec![2, 1, 1]);
    }

    #[test]
    fn should_have_no_segments_when_empty() {
        let series = TimeSeries::new("CO", "North", date("2024-01-09"), date("2024-01-15"), vec![]);

        assert!(series.segments().is_empty());
    }
}
