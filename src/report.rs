use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use crate::models::{MessageRecord, MonthKey, RankingEntry, SentimentLabel};
use crate::pipeline::{Analysis, AnalysisParams};

#[derive(Debug, Clone, PartialEq)]
pub struct LabelSummary {
    pub label: SentimentLabel,
    pub count: usize,
    pub avg_length: f64,
}

pub fn summarize_by_label(records: &[MessageRecord]) -> Vec<LabelSummary> {
    let mut map: HashMap<SentimentLabel, (usize, usize)> = HashMap::new();

    for record in records {
        let entry = map.entry(record.sentiment).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.length;
    }

    let mut summaries: Vec<LabelSummary> = map
        .into_iter()
        .map(|(label, (count, total_length))| LabelSummary {
            label,
            count,
            avg_length: if count == 0 {
                0.0
            } else {
                total_length as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.as_str().cmp(b.label.as_str())));
    summaries
}

fn by_month(entries: &[RankingEntry]) -> BTreeMap<MonthKey, Vec<&RankingEntry>> {
    let mut months: BTreeMap<MonthKey, Vec<&RankingEntry>> = BTreeMap::new();
    for entry in entries {
        months.entry(entry.month).or_default().push(entry);
    }
    months
}

fn format_ranked(entries: &[&RankingEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{}. {} ({:+})", e.rank, e.employee_id, e.score))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_report(records: &[MessageRecord], analysis: &Analysis, params: AnalysisParams) -> String {
    let summaries = summarize_by_label(records);
    let undated = records.iter().filter(|r| r.timestamp.is_none()).count();

    let mut output = String::new();

    let _ = writeln!(output, "# Employee Sentiment Report");
    let _ = writeln!(
        output,
        "{} messages, {} without a usable date; {} employee-months scored.",
        records.len(),
        undated,
        analysis.scores.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Sentiment Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No messages loaded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} messages (avg length {:.1})",
                summary.label, summary.count, summary.avg_length
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Rankings (top {})", params.top_k);

    let best = by_month(&analysis.best);
    let worst = by_month(&analysis.worst);
    if best.is_empty() {
        let _ = writeln!(output, "No dated messages to rank.");
    } else {
        let _ = writeln!(output, "| Month | Most positive | Most negative |");
        let _ = writeln!(output, "|---|---|---|");
        for (month, entries) in best.iter() {
            let negative = worst.get(month).map(|e| format_ranked(e)).unwrap_or_default();
            let _ = writeln!(output, "| {} | {} | {} |", month, format_ranked(entries), negative);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "## Flight Risk ({}+ negative messages within {} days)",
        params.threshold, params.window_days
    );

    if analysis.flight_risk.is_empty() {
        let _ = writeln!(output, "No employees flagged.");
    } else {
        for window in analysis.flight_risk.iter() {
            let _ = writeln!(
                output,
                "- {}: {} negative messages between {} and {}",
                window.employee_id, window.negative_count, window.window_start, window.window_end
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::analyze;
    use chrono::NaiveDate;

    fn record(employee: &str, day: u32, sentiment: SentimentLabel, length: usize) -> MessageRecord {
        MessageRecord {
            employee_id: employee.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2011, 7, day).and_then(|d| d.and_hms_opt(10, 0, 0)),
            sentiment,
            length,
        }
    }

    const PARAMS: AnalysisParams = AnalysisParams {
        top_k: 3,
        window_days: 30,
        threshold: 2,
    };

    #[test]
    fn label_summary_orders_by_count() {
        let records = vec![
            record("a", 1, SentimentLabel::Negative, 10),
            record("a", 2, SentimentLabel::Negative, 30),
            record("b", 2, SentimentLabel::Positive, 5),
        ];
        let summaries = summarize_by_label(&records);
        assert_eq!(summaries[0].label, SentimentLabel::Negative);
        assert_eq!(summaries[0].count, 2);
        assert!((summaries[0].avg_length - 20.0).abs() < 1e-9);
        assert_eq!(summaries[1].label, SentimentLabel::Positive);
    }

    #[test]
    fn report_lists_rankings_and_flags() {
        let records = vec![
            record("alice", 1, SentimentLabel::Negative, 10),
            record("alice", 9, SentimentLabel::Negative, 10),
            record("bob", 3, SentimentLabel::Positive, 10),
        ];
        let analysis = analyze(&records, PARAMS).unwrap();
        let report = build_report(&records, &analysis, PARAMS);

        assert!(report.contains("| 2011-07 | 1. bob (+1), 2. alice (-2) | 1. alice (-2), 2. bob (+1) |"));
        assert!(report.contains("- alice: 2 negative messages between 2011-07-01 and 2011-07-09"));
    }

    #[test]
    fn empty_report_still_renders() {
        let analysis = analyze(&[], PARAMS).unwrap();
        let report = build_report(&[], &analysis, PARAMS);
        assert!(report.contains("No messages loaded."));
        assert!(report.contains("No dated messages to rank."));
        assert!(report.contains("No employees flagged."));
    }
}
