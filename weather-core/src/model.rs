use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Text form of `observed_at` in the store and in reports (UTC, second precision).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One weather reading for a location, as reported by the data source.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub location: String,
    pub observed_at: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
    pub description: String,
}

impl Observation {
    pub fn observed_at_text(&self) -> String {
        format_timestamp(self.observed_at)
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {}: {:.2}°C, {:.2}% humidity, {}",
            self.location,
            self.observed_at_text(),
            self.temperature_celsius,
            self.humidity_percent,
            self.description,
        )
    }
}

/// Mean temperature and humidity over one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub observation_count: u64,
    pub avg_temperature_celsius: f64,
    pub avg_humidity_percent: f64,
}

/// Result of the summary step.
///
/// `NoData` is a valid outcome, not a failure: nothing was recorded for the day.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryOutcome {
    Summary(DailySummary),
    NoData { date: NaiveDate },
}

impl SummaryOutcome {
    pub fn date(&self) -> NaiveDate {
        match self {
            SummaryOutcome::Summary(summary) => summary.date,
            SummaryOutcome::NoData { date } => *date,
        }
    }

    pub fn summary(&self) -> Option<&DailySummary> {
        match self {
            SummaryOutcome::Summary(summary) => Some(summary),
            SummaryOutcome::NoData { .. } => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, SummaryOutcome::NoData { .. })
    }

    /// Human-readable report for the operator.
    pub fn report(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryOutcome::Summary(s) => {
                writeln!(f, "Weather Summary for {}:", s.date.format("%Y-%m-%d"))?;
                writeln!(f, "Average Temperature: {:.2}°C", s.avg_temperature_celsius)?;
                writeln!(f, "Average Humidity: {:.2}%", s.avg_humidity_percent)?;
                write!(f, "Observations: {}", s.observation_count)
            }
            SummaryOutcome::NoData { date } => {
                write!(f, "Weather Summary for {}: no data for this date", date.format("%Y-%m-%d"))
            }
        }
    }
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok().map(|ndt| ndt.and_utc())
}

pub fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn unix_timestamp_formats_as_utc_text() {
        let ts = unix_to_utc(1_700_000_000).unwrap();
        assert_eq!(format_timestamp(ts), "2023-11-14 22:13:20");
    }

    #[test]
    fn timestamp_text_parses_back() {
        let ts = unix_to_utc(1_711_929_600).unwrap();
        let text = format_timestamp(ts);
        assert_eq!(parse_timestamp(&text), Some(ts));
        assert_eq!(parse_timestamp("2024-04-01T00:00:00Z"), None);
    }

    #[test]
    fn summary_report_uses_two_decimals() {
        let outcome = SummaryOutcome::Summary(DailySummary {
            date: date("2024-04-01"),
            observation_count: 2,
            avg_temperature_celsius: 15.0,
            avg_humidity_percent: 60.0,
        });

        let report = outcome.report();
        assert!(report.contains("2024-04-01"));
        assert!(report.contains("Average Temperature: 15.00°C"));
        assert!(report.contains("Average Humidity: 60.00%"));
        assert!(!outcome.is_no_data());
    }

    #[test]
    fn no_data_report_has_no_numbers() {
        let outcome = SummaryOutcome::NoData { date: date("2024-04-02") };

        let report = outcome.report();
        assert!(report.contains("no data for this date"));
        assert!(!report.contains("0.00"));
        assert!(!report.contains("NaN"));
        assert!(outcome.summary().is_none());
        assert_eq!(outcome.date(), date("2024-04-02"));
    }
}
