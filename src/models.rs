use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    /// Per-message score contribution.
    pub fn contribution(self) -> i64 {
        match self {
            SentimentLabel::Positive => 1,
            SentimentLabel::Negative => -1,
            SentimentLabel::Neutral => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "Positive",
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown sentiment label: {0}")]
pub struct UnknownLabel(pub String);

impl FromStr for SentimentLabel {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "positive" | "pos" => Ok(SentimentLabel::Positive),
            "negative" | "neg" => Ok(SentimentLabel::Negative),
            "neutral" | "neu" => Ok(SentimentLabel::Neutral),
            _ => Err(UnknownLabel(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub employee_id: String,
    pub timestamp: Option<NaiveDateTime>,
    pub sentiment: SentimentLabel,
    pub length: usize,
}

impl MessageRecord {
    pub fn month(&self) -> Option<MonthKey> {
        self.timestamp.map(MonthKey::from_timestamp)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn from_timestamp(timestamp: NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyScore {
    pub employee_id: String,
    pub month: MonthKey,
    pub score: i64,
    pub message_count: usize,
    pub avg_length: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Best,
    Worst,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Best => "best",
            Direction::Worst => "worst",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    pub month: MonthKey,
    pub rank: usize,
    pub employee_id: String,
    pub score: i64,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FlightRiskFlag {
    pub employee_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_contributions() {
        assert_eq!(SentimentLabel::Positive.contribution(), 1);
        assert_eq!(SentimentLabel::Negative.contribution(), -1);
        assert_eq!(SentimentLabel::Neutral.contribution(), 0);
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("NEGATIVE".parse::<SentimentLabel>(), Ok(SentimentLabel::Negative));
        assert_eq!(" positive ".parse::<SentimentLabel>(), Ok(SentimentLabel::Positive));
        let err = "angry".parse::<SentimentLabel>().unwrap_err();
        assert_eq!(err, UnknownLabel("angry".to_string()));
        assert_eq!(err.to_string(), "unknown sentiment label: angry");
    }

    #[test]
    fn month_keys_order_by_year_then_month() {
        let dec = MonthKey { year: 2010, month: 12 };
        let jan = MonthKey { year: 2011, month: 1 };
        assert!(dec < jan);
        assert_eq!(jan.to_string(), "2011-01");
    }

    #[test]
    fn record_without_timestamp_has_no_month() {
        let mut record = MessageRecord {
            employee_id: "avery@example.com".to_string(),
            timestamp: None,
            sentiment: SentimentLabel::Neutral,
            length: 0,
        };
        assert_eq!(record.month(), None);

        record.timestamp = NaiveDate::from_ymd_opt(2011, 3, 31).and_then(|d| d.and_hms_opt(23, 59, 0));
        assert_eq!(record.month(), Some(MonthKey { year: 2011, month: 3 }));
    }
}
