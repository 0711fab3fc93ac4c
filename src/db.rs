use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::{PgPool, Row};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::models::{MessageRecord, MonthKey, RankingEntry, SentimentLabel};
use crate::output::RunOutputs;
use crate::records::{self, RawMessage};

/// Dedup key for an imported row: the message id when the export has one,
/// otherwise a name-based UUID over sender, raw date, subject and body, so
/// re-importing the same file inserts nothing new.
pub fn source_key(row: &RawMessage) -> String {
    if let Some(id) = row.message_id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
        return id.to_string();
    }

    let mut name = Vec::new();
    for part in [
        row.employee_id.trim(),
        row.timestamp.as_deref().unwrap_or_default(),
        row.subject.as_deref().unwrap_or_default(),
        row.body.as_deref().unwrap_or_default(),
    ] {
        name.extend_from_slice(part.as_bytes());
        name.push(0x1f);
    }
    format!("row-{}", Uuid::new_v5(&Uuid::NAMESPACE_OID, &name))
}

fn column_i32<T>(value: T, column: &str) -> anyhow::Result<i32>
where
    T: TryInto<i32> + Copy + std::fmt::Display,
{
    value
        .try_into()
        .ok()
        .with_context(|| format!("{column} value {value} does not fit the database column"))
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Normalizes and stores rows; rows already stored under the same
/// `source_key` are left alone.
pub async fn import_messages<C: Classifier + ?Sized>(
    pool: &PgPool,
    rows: Vec<RawMessage>,
    classifier: &C,
) -> anyhow::Result<usize> {
    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for row in rows {
        let source_key = source_key(&row);

        let Some(record) = records::normalize_row(row, classifier) else {
            skipped += 1;
            continue;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO employee_sentiment.messages
            (id, employee_id, sent_at, sentiment, length, source_key)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&record.employee_id)
        .bind(record.timestamp)
        .bind(record.sentiment.as_str())
        .bind(column_i32(record.length, "length")?)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    if skipped > 0 {
        warn!(count = skipped, "rows without a sender were not imported");
    }
    info!(inserted, "imported messages");
    Ok(inserted)
}

pub async fn fetch_messages(
    pool: &PgPool,
    since_date: Option<NaiveDate>,
    employee: Option<&str>,
) -> anyhow::Result<Vec<MessageRecord>> {
    let mut query = String::from(
        "SELECT employee_id, sent_at, sentiment, length \
         FROM employee_sentiment.messages \
         WHERE TRUE",
    );

    let mut param = 0;
    if since_date.is_some() {
        param += 1;
        query.push_str(&format!(" AND sent_at >= ${param}"));
    }
    if employee.is_some() {
        param += 1;
        query.push_str(&format!(" AND employee_id = ${param}"));
    }

    let mut rows = sqlx::query(&query);
    if let Some(value) = since_date {
        rows = rows.bind(value.and_hms_opt(0, 0, 0));
    }
    if let Some(value) = employee {
        rows = rows.bind(value);
    }

    let fetched = rows.fetch_all(pool).await?;
    let mut messages = Vec::with_capacity(fetched.len());

    for row in fetched {
        let label: String = row.try_get("sentiment")?;
        let sentiment = label
            .parse::<SentimentLabel>()
            .context("stored message has an unknown sentiment")?;
        let length: i32 = row.try_get("length")?;

        messages.push(MessageRecord {
            employee_id: row.try_get("employee_id")?,
            timestamp: row.try_get::<Option<NaiveDateTime>, _>("sent_at")?,
            sentiment,
            length: usize::try_from(length).unwrap_or(0),
        });
    }

    Ok(messages)
}

#[derive(Debug, Clone, Copy)]
pub struct RunParameters {
    pub top_k: i64,
    pub window_days: i64,
    pub threshold: i64,
}

fn month_date(month: MonthKey) -> anyhow::Result<NaiveDate> {
    month
        .first_day()
        .with_context(|| format!("month {month} is out of range"))
}

async fn insert_rankings(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    run_id: Uuid,
    entries: &[RankingEntry],
) -> anyhow::Result<()> {
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO employee_sentiment.rankings
            (run_id, month, direction, rank, employee_id, score)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run_id)
        .bind(month_date(entry.month)?)
        .bind(entry.direction.as_str())
        .bind(column_i32(entry.rank, "rank")?)
        .bind(&entry.employee_id)
        .bind(entry.score)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Persists one run's result tables atomically and returns the run id.
pub async fn store_run(
    pool: &PgPool,
    params: RunParameters,
    outputs: &RunOutputs<'_>,
) -> anyhow::Result<Uuid> {
    let run_id = Uuid::new_v4();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO employee_sentiment.runs (id, top_k, window_days, threshold)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(run_id)
    .bind(column_i32(params.top_k, "top_k")?)
    .bind(column_i32(params.window_days, "window_days")?)
    .bind(column_i32(params.threshold, "threshold")?)
    .execute(&mut *tx)
    .await?;

    for score in outputs.scores {
        sqlx::query(
            r#"
            INSERT INTO employee_sentiment.monthly_scores
            (run_id, employee_id, month, score, message_count, avg_length)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(run_id)
        .bind(&score.employee_id)
        .bind(month_date(score.month)?)
        .bind(score.score)
        .bind(column_i32(score.message_count, "message_count")?)
        .bind(score.avg_length)
        .execute(&mut *tx)
        .await?;
    }

    insert_rankings(&mut tx, run_id, outputs.best).await?;
    insert_rankings(&mut tx, run_id, outputs.worst).await?;

    for window in outputs.flight_risk {
        sqlx::query(
            r#"
            INSERT INTO employee_sentiment.flight_risk
            (run_id, employee_id, window_start, window_end, negative_count)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(run_id)
        .bind(&window.employee_id)
        .bind(window.window_start)
        .bind(window.window_end)
        .bind(column_i32(window.negative_count, "negative_count")?)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(%run_id, "stored run");
    Ok(run_id)
}
