use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use employee_sentiment::classifier::LexiconClassifier;
use employee_sentiment::config::{self, Config};
use employee_sentiment::model::{feature_table, ScoreModel};
use employee_sentiment::models::{Direction, FlightRiskFlag, MessageRecord};
use employee_sentiment::pipeline::{analyze, AnalysisParams};
use employee_sentiment::{aggregate, db, detect, output, rank_top, records, report, risk};

#[derive(Parser)]
#[command(name = "employee-sentiment")]
#[command(about = "Monthly sentiment scoring and flight-risk detection for employee messages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Read messages from a CSV export instead of the Postgres store
    #[arg(long)]
    csv: Option<PathBuf>,
    /// Only consider messages sent on or after this date (YYYY-MM-DD)
    #[arg(long)]
    since: Option<NaiveDate>,
    /// Only consider messages from this employee
    #[arg(long)]
    employee: Option<String>,
}

#[derive(Args)]
struct ParamArgs {
    /// Employees listed per month in each ranking
    #[arg(long, allow_negative_numbers = true)]
    top_k: Option<i64>,
    /// Length of the flight-risk window in days
    #[arg(long, allow_negative_numbers = true)]
    window_days: Option<i64>,
    /// Negative messages inside one window that flag an employee
    #[arg(long, allow_negative_numbers = true)]
    threshold: Option<i64>,
}

impl ParamArgs {
    fn resolve(&self, config: &Config) -> AnalysisParams {
        AnalysisParams {
            top_k: self.top_k.unwrap_or(config.top_k),
            window_days: self.window_days.unwrap_or(config.window_days),
            threshold: self.threshold.unwrap_or(config.threshold),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RankDirection {
    Best,
    Worst,
    Both,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Label and import messages from a CSV export
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print monthly sentiment scores per employee
    Scores {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print the monthly top and bottom employees
    Rank {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long, value_enum, default_value_t = RankDirection::Both)]
        direction: RankDirection,
    },
    /// List employees with sustained negativity
    FlightRisk {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        params: ParamArgs,
        /// Print flags as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fit the monthly score regression and print its metrics
    Model {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write all result tables as CSV files
    Export {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long, default_value = "results")]
        out_dir: PathBuf,
        /// Also store the run in Postgres
        #[arg(long)]
        persist: bool,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        params: ParamArgs,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config.require_database_url()?;
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn load_records(config: &Config, source: &SourceArgs) -> anyhow::Result<Vec<MessageRecord>> {
    match &source.csv {
        Some(path) => {
            let batch = records::load_csv(path, &LexiconClassifier::new())?;
            let since = source.since.and_then(|d| d.and_hms_opt(0, 0, 0));
            Ok(batch
                .records
                .into_iter()
                .filter(|r| since.map_or(true, |s| r.timestamp.is_some_and(|t| t >= s)))
                .filter(|r| source.employee.as_deref().map_or(true, |e| r.employee_id == e))
                .collect())
        }
        None => {
            let pool = connect(config).await?;
            let messages = db::fetch_messages(&pool, source.since, source.employee.as_deref()).await?;
            info!(records = messages.len(), "loaded messages from Postgres");
            Ok(messages)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load()?;

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let parsed = records::read_csv(&csv)?;
            let inserted = db::import_messages(&pool, parsed.rows, &LexiconClassifier::new()).await?;
            println!("Inserted {inserted} messages from {}.", csv.display());
            if parsed.bad_rows > 0 {
                println!("Skipped {} undecodable rows.", parsed.bad_rows);
            }
        }
        Commands::Scores { source } => {
            let messages = load_records(&config, &source).await?;
            let scores = aggregate(&messages);

            if scores.is_empty() {
                println!("No dated messages found.");
                return Ok(());
            }

            for score in scores.iter() {
                println!(
                    "- {} {} score {:+} across {} messages (avg length {:.1})",
                    score.month, score.employee_id, score.score, score.message_count, score.avg_length
                );
            }
        }
        Commands::Rank {
            source,
            params,
            direction,
        } => {
            let params = params.resolve(&config);
            let messages = load_records(&config, &source).await?;
            let scores = aggregate(&messages);

            let directions: &[Direction] = match direction {
                RankDirection::Best => &[Direction::Best],
                RankDirection::Worst => &[Direction::Worst],
                RankDirection::Both => &[Direction::Best, Direction::Worst],
            };

            for direction in directions {
                let entries = rank_top(&scores, params.top_k, *direction)?;
                println!("Top {} ({}) per month:", params.top_k, direction.as_str());
                if entries.is_empty() {
                    println!("  nothing to rank");
                }
                for entry in entries.iter() {
                    println!(
                        "  {} #{} {} ({:+})",
                        entry.month, entry.rank, entry.employee_id, entry.score
                    );
                }
            }
        }
        Commands::FlightRisk {
            source,
            params,
            json,
        } => {
            let params = params.resolve(&config);
            let messages = load_records(&config, &source).await?;

            if json {
                let flags: Vec<FlightRiskFlag> = detect(&messages, params.window_days, params.threshold)?
                    .into_iter()
                    .map(|employee_id| FlightRiskFlag { employee_id })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&flags)?);
                return Ok(());
            }

            let windows = risk::qualifying_windows(&messages, params.window_days, params.threshold)?;
            if windows.is_empty() {
                println!("No employees flagged.");
                return Ok(());
            }

            println!(
                "Employees with {}+ negative messages within {} days:",
                params.threshold, params.window_days
            );
            for window in windows.iter() {
                println!(
                    "- {} ({} negative, {} to {})",
                    window.employee_id, window.negative_count, window.window_start, window.window_end
                );
            }
        }
        Commands::Model { source } => {
            let messages = load_records(&config, &source).await?;
            let features = feature_table(&aggregate(&messages));
            let model = ScoreModel::fit(&features)?;
            print!("{}", model.summary());
        }
        Commands::Export {
            source,
            params,
            out_dir,
            persist,
        } => {
            let params = params.resolve(&config);
            let messages = load_records(&config, &source).await?;
            let analysis = analyze(&messages, params)?;

            let written = output::write_all(&out_dir, &analysis.outputs())?;
            for path in written.iter() {
                println!("Wrote {}.", path.display());
            }

            if persist {
                let pool = connect(&config).await?;
                let run_id = db::store_run(
                    &pool,
                    db::RunParameters {
                        top_k: params.top_k,
                        window_days: params.window_days,
                        threshold: params.threshold,
                    },
                    &analysis.outputs(),
                )
                .await?;
                println!("Stored run {run_id}.");
            }
        }
        Commands::Report {
            source,
            params,
            out,
        } => {
            let params = params.resolve(&config);
            let messages = load_records(&config, &source).await?;
            let analysis = analyze(&messages, params)?;
            let report = report::build_report(&messages, &analysis, params);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
