use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::models::{MessageRecord, SentimentLabel};

/// One row of a message log as exported from the mail archive.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMessage {
    #[serde(alias = "from", alias = "sender", alias = "employee")]
    pub employee_id: String,
    #[serde(default, alias = "date", alias = "sent_at")]
    pub timestamp: Option<String>,
    #[serde(default, alias = "Subject")]
    pub subject: Option<String>,
    #[serde(default, alias = "text", alias = "message")]
    pub body: Option<String>,
    #[serde(default, alias = "label", alias = "Sentiment")]
    pub sentiment: Option<String>,
    #[serde(default, alias = "Message-ID", alias = "message-id")]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub records: Vec<MessageRecord>,
    pub malformed_timestamps: usize,
    pub skipped_rows: usize,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%b-%Y"];

/// Parses the timestamp formats seen in mail exports. Offsets are dropped and
/// the sender's wall-clock time is kept, so month buckets follow the sender.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // "Mon, 14 May 2001 16:39:00 -0700 (PDT)" carries a trailing zone comment.
    let without_comment = match trimmed.find(" (") {
        Some(idx) if trimmed.ends_with(')') => trimmed[..idx].trim_end(),
        _ => trimmed,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(without_comment) {
        return Some(parsed.naive_local());
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(without_comment) {
        return Some(parsed.naive_local());
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(without_comment, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(without_comment, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Builds a record from one row. Rows without a sender yield `None`.
///
/// A row's own sentiment column wins when it parses; otherwise the body goes
/// through `classifier`, and an absent body is Neutral with length 0.
pub fn normalize_row<C: Classifier + ?Sized>(row: RawMessage, classifier: &C) -> Option<MessageRecord> {
    let employee_id = row.employee_id.trim().to_string();
    if employee_id.is_empty() {
        return None;
    }

    let timestamp = row.timestamp.as_deref().and_then(parse_timestamp);
    if timestamp.is_none() {
        debug!(employee = %employee_id, raw = ?row.timestamp, "unparsable timestamp");
    }

    let body = row.body.unwrap_or_default();
    let sentiment = row
        .sentiment
        .as_deref()
        .and_then(|label| label.parse::<SentimentLabel>().ok())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                SentimentLabel::Neutral
            } else {
                classifier.classify(&body)
            }
        });

    Some(MessageRecord {
        employee_id,
        timestamp,
        sentiment,
        length: body.chars().count(),
    })
}

pub fn normalize<C: Classifier + ?Sized>(rows: Vec<RawMessage>, classifier: &C) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();

    for row in rows {
        match normalize_row(row, classifier) {
            Some(record) => {
                if record.timestamp.is_none() {
                    batch.malformed_timestamps += 1;
                }
                batch.records.push(record);
            }
            None => batch.skipped_rows += 1,
        }
    }

    if batch.malformed_timestamps > 0 {
        warn!(
            count = batch.malformed_timestamps,
            "records without a usable timestamp are excluded from temporal analysis"
        );
    }
    if batch.skipped_rows > 0 {
        warn!(count = batch.skipped_rows, "rows without a sender were skipped");
    }

    batch
}

#[derive(Debug, Default)]
pub struct CsvRows {
    pub rows: Vec<RawMessage>,
    /// Rows the reader could not decode, such as a wrong field count.
    pub bad_rows: usize,
}

/// Reads every decodable row. Undecodable rows are logged and counted so one
/// bad line does not drop the rest of the export.
pub fn read_csv(csv_path: &Path) -> anyhow::Result<CsvRows> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut parsed = CsvRows::default();

    for (line, result) in reader.deserialize::<RawMessage>().enumerate() {
        match result {
            Ok(row) => parsed.rows.push(row),
            Err(err) => {
                parsed.bad_rows += 1;
                warn!(path = %csv_path.display(), row = line + 2, error = %err, "skipping undecodable row");
            }
        }
    }

    Ok(parsed)
}

pub fn load_csv<C: Classifier + ?Sized>(
    csv_path: &Path,
    classifier: &C,
) -> anyhow::Result<NormalizedBatch> {
    let parsed = read_csv(csv_path)?;
    let mut batch = normalize(parsed.rows, classifier);
    batch.skipped_rows += parsed.bad_rows;
    info!(
        path = %csv_path.display(),
        records = batch.records.len(),
        "loaded message log"
    );
    Ok(batch)
}
