use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{require_positive, EngineResult};
use crate::models::{MessageRecord, SentimentLabel};

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_THRESHOLD: i64 = 4;

/// The first run of negative messages that tripped the flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifyingWindow {
    pub employee_id: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub negative_count: usize,
}

/// Two-pointer scan over ascending `dates`.
///
/// Two dates are in the same window when they are at most `window_days`
/// calendar days apart. Returns the first window holding `threshold` dates as
/// `(start, end, count)`. Both pointers only move forward.
pub fn scan_window(dates: &[NaiveDate], window_days: usize, threshold: usize) -> Option<(NaiveDate, NaiveDate, usize)> {
    if threshold == 0 || dates.len() < threshold {
        return None;
    }

    let span = window_days as i64;
    let mut lo = 0usize;
    for hi in 0..dates.len() {
        while (dates[hi] - dates[lo]).num_days() > span {
            lo += 1;
        }
        let count = hi - lo + 1;
        if count >= threshold {
            return Some((dates[lo], dates[hi], count));
        }
    }

    None
}

pub fn flag_sequence(dates: &[NaiveDate], window_days: usize, threshold: usize) -> bool {
    scan_window(dates, window_days, threshold).is_some()
}

/// Negative-message dates per employee, ascending. Only Negative records with
/// a timestamp are considered.
fn negative_dates_by_employee(records: &[MessageRecord]) -> HashMap<&str, Vec<NaiveDate>> {
    let mut grouped: HashMap<&str, Vec<NaiveDate>> = HashMap::new();
    for record in records {
        if record.sentiment != SentimentLabel::Negative {
            continue;
        }
        let Some(timestamp) = record.timestamp else {
            continue;
        };
        grouped
            .entry(record.employee_id.as_str())
            .or_default()
            .push(timestamp.date());
    }
    for dates in grouped.values_mut() {
        dates.sort_unstable();
    }
    grouped
}

/// Every employee with at least one qualifying window, with the first such
/// window. Employees are scanned in parallel; results are ordered by id.
pub fn qualifying_windows(
    records: &[MessageRecord],
    window_days: i64,
    threshold: i64,
) -> EngineResult<Vec<QualifyingWindow>> {
    let window_days = require_positive("window_days", window_days)?;
    let threshold = require_positive("threshold", threshold)?;

    let grouped = negative_dates_by_employee(records);
    let mut windows: Vec<QualifyingWindow> = grouped
        .into_par_iter()
        .filter(|(_, dates)| dates.len() >= threshold)
        .filter_map(|(employee_id, dates)| {
            scan_window(&dates, window_days, threshold).map(|(window_start, window_end, negative_count)| {
                QualifyingWindow {
                    employee_id: employee_id.to_string(),
                    window_start,
                    window_end,
                    negative_count,
                }
            })
        })
        .collect();

    windows.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    debug!(flagged = windows.len(), window_days, threshold, "flight-risk scan finished");
    Ok(windows)
}

/// Employees with at least `threshold` negative messages inside some span of
/// `window_days` days.
pub fn detect(records: &[MessageRecord], window_days: i64, threshold: i64) -> EngineResult<BTreeSet<String>> {
    Ok(qualifying_windows(records, window_days, threshold)?
        .into_iter()
        .map(|window| window.employee_id)
        .collect())
}
