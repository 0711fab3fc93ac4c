use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::error::{require_non_negative, EngineResult};
use crate::models::{Direction, MonthKey, MonthlyScore, RankingEntry};

pub const DEFAULT_TOP_K: i64 = 3;

fn compare(direction: Direction, a: &MonthlyScore, b: &MonthlyScore) -> Ordering {
    let by_score = match direction {
        Direction::Best => b.score.cmp(&a.score),
        Direction::Worst => a.score.cmp(&b.score),
    };
    // Ties always resolve by employee id ascending, in both directions.
    by_score.then_with(|| a.employee_id.cmp(&b.employee_id))
}

/// Top `k` employees for every month present in `scores`.
///
/// Months are ranked independently and returned in ascending month order,
/// each with 1-based ranks. A month with fewer than `k` employees returns all
/// of them.
pub fn rank_top(scores: &[MonthlyScore], k: i64, direction: Direction) -> EngineResult<Vec<RankingEntry>> {
    let k = require_non_negative("k", k)?;

    let mut by_month: BTreeMap<MonthKey, Vec<&MonthlyScore>> = BTreeMap::new();
    for score in scores {
        by_month.entry(score.month).or_default().push(score);
    }

    let mut entries = Vec::new();
    for (month, mut month_scores) in by_month {
        month_scores.sort_unstable_by(|a, b| compare(direction, a, b));
        entries.extend(
            month_scores
                .into_iter()
                .take(k)
                .enumerate()
                .map(|(idx, score)| RankingEntry {
                    month,
                    rank: idx + 1,
                    employee_id: score.employee_id.clone(),
                    score: score.score,
                    direction,
                }),
        );
    }

    Ok(entries)
}

/// Runs both rankings over the same scores.
pub fn rank_both(scores: &[MonthlyScore], k: i64) -> EngineResult<(Vec<RankingEntry>, Vec<RankingEntry>)> {
    let best = rank_top(scores, k, Direction::Best)?;
    let worst = rank_top(scores, k, Direction::Worst)?;
    Ok((best, worst))
}
