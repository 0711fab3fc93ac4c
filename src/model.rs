//! Monthly score regression.
//!
//! Fits `score ~ intercept + message_count + avg_length` over the aggregated
//! employee-months with ordinary least squares, solving the normal equations
//! by Cholesky decomposition.

use ndarray::{Array1, Array2};
use serde::Serialize;
use thiserror::Error;

use crate::models::{MonthKey, MonthlyScore};

pub const FEATURE_NAMES: [&str; 2] = ["message_count", "avg_length"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("need at least {needed} rows to fit, got {got}")]
    NotEnoughRows { needed: usize, got: usize },

    #[error("normal equations are singular; features may be constant or collinear")]
    SingularMatrix,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub employee_id: String,
    pub month: MonthKey,
    pub message_count: usize,
    pub avg_length: f64,
    pub score: i64,
}

pub fn feature_table(scores: &[MonthlyScore]) -> Vec<FeatureRow> {
    scores
        .iter()
        .map(|s| FeatureRow {
            employee_id: s.employee_id.clone(),
            month: s.month,
            message_count: s.message_count,
            avg_length: s.avg_length,
            score: s.score,
        })
        .collect()
}

fn design_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    let mut x = Array2::<f64>::ones((rows.len(), FEATURE_NAMES.len() + 1));
    for (i, row) in rows.iter().enumerate() {
        x[[i, 1]] = row.message_count as f64;
        x[[i, 2]] = row.avg_length;
    }
    x
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    pub n_samples: usize,
}

impl ModelMetrics {
    pub fn calculate(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len();
        let n_f = n.max(1) as f64;

        let residuals: Vec<f64> = y_true.iter().zip(y_pred.iter()).map(|(t, p)| t - p).collect();
        let mse = residuals.iter().map(|r| r * r).sum::<f64>() / n_f;
        let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / n_f;

        let mean = y_true.mean().unwrap_or(0.0);
        let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
        let ss_res: f64 = residuals.iter().map(|r| r * r).sum();
        // A constant target is explained perfectly or not at all.
        let r2 = if ss_tot == 0.0 {
            if ss_res == 0.0 { 1.0 } else { 0.0 }
        } else {
            1.0 - ss_res / ss_tot
        };

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2,
            n_samples: n,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub metrics: ModelMetrics,
}

impl ScoreModel {
    pub fn fit(rows: &[FeatureRow]) -> Result<Self, ModelError> {
        let needed = FEATURE_NAMES.len() + 2;
        if rows.len() < needed {
            return Err(ModelError::NotEnoughRows {
                needed,
                got: rows.len(),
            });
        }

        let x = design_matrix(rows);
        let y: Array1<f64> = rows.iter().map(|r| r.score as f64).collect();

        let xt = x.t();
        let xtx = xt.dot(&x);
        let xty = xt.dot(&y);
        let beta = cholesky_solve(&xtx, &xty)?;

        let predictions = x.dot(&beta);
        let metrics = ModelMetrics::calculate(&y, &predictions);

        Ok(Self {
            intercept: beta[0],
            coefficients: beta.iter().skip(1).copied().collect(),
            metrics,
        })
    }

    pub fn predict(&self, message_count: usize, avg_length: f64) -> f64 {
        self.intercept + self.coefficients[0] * message_count as f64 + self.coefficients[1] * avg_length
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!("Intercept: {:.6}\n", self.intercept));
        for (name, coef) in FEATURE_NAMES.iter().zip(self.coefficients.iter()) {
            s.push_str(&format!("  {:15}: {:>12.6}\n", name, coef));
        }
        s.push_str(&format!(
            "MSE {:.4} | RMSE {:.4} | MAE {:.4} | R² {:.4} | n = {}\n",
            self.metrics.mse, self.metrics.rmse, self.metrics.mae, self.metrics.r2, self.metrics.n_samples
        ));
        s
    }
}

/// Solves `a * x = b` for symmetric positive-definite `a`.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }

            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 1e-9 * a[[i, i]].abs().max(1.0) {
                    return Err(ModelError::SingularMatrix);
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    let mut z = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * z[j];
        }
        z[i] = (b[i] - sum) / l[[i, i]];
    }

    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (z[i] - sum) / l[[i, i]];
    }

    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: usize, message_count: usize, avg_length: f64, score: i64) -> FeatureRow {
        FeatureRow {
            employee_id: format!("e{idx}"),
            month: MonthKey { year: 2011, month: 1 },
            message_count,
            avg_length,
            score,
        }
    }

    #[test]
    fn recovers_exact_linear_relationship() {
        // score = 1 + 2 * count - 0.5 * length
        let data = [(1, 2.0), (2, 4.0), (3, 2.0), (4, 8.0), (5, 6.0), (6, 10.0)];
        let rows: Vec<_> = data
            .iter()
            .enumerate()
            .map(|(i, &(c, l))| row(i, c, l, (1.0 + 2.0 * c as f64 - 0.5 * l) as i64))
            .collect();

        let model = ScoreModel::fit(&rows).unwrap();
        assert!((model.intercept - 1.0).abs() < 1e-6);
        assert!((model.coefficients[0] - 2.0).abs() < 1e-6);
        assert!((model.coefficients[1] + 0.5).abs() < 1e-6);
        assert!(model.metrics.mse < 1e-9);
        assert!((model.metrics.r2 - 1.0).abs() < 1e-9);
        assert!((model.predict(10, 4.0) - 19.0).abs() < 1e-6);
    }

    #[test]
    fn too_few_rows_is_an_error() {
        let rows = vec![row(0, 1, 1.0, 1), row(1, 2, 2.0, 2)];
        assert_eq!(
            ScoreModel::fit(&rows).unwrap_err(),
            ModelError::NotEnoughRows { needed: 4, got: 2 }
        );
    }

    #[test]
    fn constant_feature_is_singular() {
        let rows: Vec<_> = (0..6).map(|i| row(i, 3, i as f64, i as i64)).collect();
        assert_eq!(ScoreModel::fit(&rows).unwrap_err(), ModelError::SingularMatrix);
    }

    #[test]
    fn feature_table_mirrors_monthly_scores() {
        let scores = vec![MonthlyScore {
            employee_id: "alice".to_string(),
            month: MonthKey { year: 2011, month: 2 },
            score: -2,
            message_count: 4,
            avg_length: 12.5,
        }];
        let table = feature_table(&scores);
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].message_count, 4);
        assert_eq!(table[0].score, -2);
    }
}
