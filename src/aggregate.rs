use std::collections::BTreeMap;

use crate::models::{MessageRecord, MonthKey, MonthlyScore};

#[derive(Default)]
struct MonthAccumulator {
    score: i64,
    message_count: usize,
    total_length: usize,
}

/// Reduces records to one `MonthlyScore` per (employee, month).
///
/// Records without a timestamp have no month and are dropped. Every group
/// holds at least one record and lengths default to zero upstream, so
/// `avg_length` is always a plain arithmetic mean. Rows come back ordered by
/// employee and then month.
pub fn aggregate(records: &[MessageRecord]) -> Vec<MonthlyScore> {
    let mut groups: BTreeMap<(&str, MonthKey), MonthAccumulator> = BTreeMap::new();

    for record in records {
        let Some(month) = record.month() else {
            continue;
        };

        let entry = groups
            .entry((record.employee_id.as_str(), month))
            .or_default();
        entry.score += record.sentiment.contribution();
        entry.message_count += 1;
        entry.total_length += record.length;
    }

    groups
        .into_iter()
        .map(|((employee_id, month), acc)| MonthlyScore {
            employee_id: employee_id.to_string(),
            month,
            score: acc.score,
            message_count: acc.message_count,
            avg_length: acc.total_length as f64 / acc.message_count as f64,
        })
        .collect()
}

/// Sum of monthly scores per employee, used by the report summary.
pub fn totals_by_employee(scores: &[MonthlyScore]) -> BTreeMap<String, i64> {
    let mut totals = BTreeMap::new();
    for score in scores {
        *totals.entry(score.employee_id.clone()).or_insert(0) += score.score;
    }
    totals
}
