use tracing::info;

use crate::aggregate::aggregate;
use crate::error::{require_non_negative, require_positive, EngineResult};
use crate::model::{feature_table, FeatureRow};
use crate::models::{MessageRecord, MonthlyScore, RankingEntry};
use crate::output::RunOutputs;
use crate::ranking::rank_both;
use crate::risk::{qualifying_windows, QualifyingWindow};

#[derive(Debug, Clone, Copy)]
pub struct AnalysisParams {
    pub top_k: i64,
    pub window_days: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    pub scores: Vec<MonthlyScore>,
    pub best: Vec<RankingEntry>,
    pub worst: Vec<RankingEntry>,
    pub flight_risk: Vec<QualifyingWindow>,
    pub features: Vec<FeatureRow>,
}

impl Analysis {
    pub fn outputs(&self) -> RunOutputs<'_> {
        RunOutputs {
            scores: &self.scores,
            best: &self.best,
            worst: &self.worst,
            flight_risk: &self.flight_risk,
            features: &self.features,
        }
    }
}

/// Runs aggregation, ranking and the flight-risk scan over one snapshot.
///
/// Parameters are validated before any work starts, so a bad `top_k` never
/// yields partial output.
pub fn analyze(records: &[MessageRecord], params: AnalysisParams) -> EngineResult<Analysis> {
    require_non_negative("k", params.top_k)?;
    require_positive("window_days", params.window_days)?;
    require_positive("threshold", params.threshold)?;

    let flight_risk = qualifying_windows(records, params.window_days, params.threshold)?;
    let scores = aggregate(records);
    let (best, worst) = rank_both(&scores, params.top_k)?;
    let features = feature_table(&scores);

    info!(
        records = records.len(),
        employee_months = scores.len(),
        flagged = flight_risk.len(),
        "analysis complete"
    );

    Ok(Analysis {
        scores,
        best,
        worst,
        flight_risk,
        features,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::models::SentimentLabel;
    use chrono::NaiveDate;

    fn record(employee: &str, day: u32, sentiment: SentimentLabel) -> MessageRecord {
        MessageRecord {
            employee_id: employee.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2011, 3, day).and_then(|d| d.and_hms_opt(8, 0, 0)),
            sentiment,
            length: 10,
        }
    }

    #[test]
    fn runs_every_stage() {
        use SentimentLabel::*;
        let records = vec![
            record("alice", 1, Negative),
            record("alice", 2, Negative),
            record("alice", 3, Negative),
            record("alice", 4, Negative),
            record("bob", 1, Positive),
            record("carol", 1, Neutral),
        ];
        let params = AnalysisParams {
            top_k: 3,
            window_days: 30,
            threshold: 4,
        };

        let analysis = analyze(&records, params).unwrap();
        assert_eq!(analysis.scores.len(), 3);
        assert_eq!(analysis.best[0].employee_id, "bob");
        assert_eq!(analysis.worst[0].employee_id, "alice");
        assert_eq!(analysis.flight_risk.len(), 1);
        assert_eq!(analysis.features.len(), 3);
    }

    #[test]
    fn invalid_parameters_fail_fast() {
        let params = AnalysisParams {
            top_k: -1,
            window_days: 30,
            threshold: 4,
        };
        assert!(matches!(
            analyze(&[], params),
            Err(EngineError::InvalidParameter { name: "k", .. })
        ));
    }

    #[test]
    fn top_k_is_checked_before_the_scan() {
        let records = vec![record("alice", 1, SentimentLabel::Negative)];
        let params = AnalysisParams {
            top_k: -2,
            window_days: 0,
            threshold: 4,
        };
        assert!(matches!(
            analyze(&records, params),
            Err(EngineError::InvalidParameter { name: "k", value: -2, .. })
        ));
    }
}
