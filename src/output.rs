use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;
use tracing::info;

use crate::model::FeatureRow;
use crate::models::{MonthlyScore, RankingEntry};
use crate::risk::QualifyingWindow;

pub struct RunOutputs<'a> {
    pub scores: &'a [MonthlyScore],
    pub best: &'a [RankingEntry],
    pub worst: &'a [RankingEntry],
    pub flight_risk: &'a [QualifyingWindow],
    pub features: &'a [FeatureRow],
}

// Headers come from the first serialized row, so an empty table is an empty file.
fn write_table<T: Serialize>(out_dir: &Path, name: &str, rows: &[T]) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(name);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

/// Writes each result table as its own CSV file under `out_dir`.
pub fn write_all(out_dir: &Path, outputs: &RunOutputs<'_>) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let written = vec![
        write_table(out_dir, "monthly_scores.csv", outputs.scores)?,
        write_table(out_dir, "rankings_best.csv", outputs.best)?,
        write_table(out_dir, "rankings_worst.csv", outputs.worst)?,
        write_table(out_dir, "flight_risk.csv", outputs.flight_risk)?,
        write_table(out_dir, "features.csv", outputs.features)?,
    ];

    info!(dir = %out_dir.display(), files = written.len(), "wrote result tables");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, MonthKey};

    #[test]
    fn writes_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let month = MonthKey { year: 2011, month: 4 };
        let scores = vec![MonthlyScore {
            employee_id: "alice".to_string(),
            month,
            score: 3,
            message_count: 5,
            avg_length: 40.0,
        }];
        let best = vec![RankingEntry {
            month,
            rank: 1,
            employee_id: "alice".to_string(),
            score: 3,
            direction: Direction::Best,
        }];

        let written = write_all(
            dir.path(),
            &RunOutputs {
                scores: &scores,
                best: &best,
                worst: &[],
                flight_risk: &[],
                features: &[],
            },
        )
        .unwrap();
        assert_eq!(written.len(), 5);

        let scores_csv = fs::read_to_string(dir.path().join("monthly_scores.csv")).unwrap();
        assert_eq!(
            scores_csv,
            "employee_id,month,score,message_count,avg_length\nalice,2011-04,3,5,40.0\n"
        );

        let best_csv = fs::read_to_string(dir.path().join("rankings_best.csv")).unwrap();
        assert!(best_csv.ends_with("2011-04,1,alice,3,best\n"));

        let worst_csv = fs::read_to_string(dir.path().join("rankings_worst.csv")).unwrap();
        assert!(worst_csv.is_empty());
    }
}
