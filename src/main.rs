use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use vahan_stats::analytics::{self, RegistrationQuery};
use vahan_stats::config::{Settings, Vocabulary};
use vahan_stats::db;
use vahan_stats::fetch::HttpSource;
use vahan_stats::ingest::Ingestor;
use vahan_stats::parser::normalize_category;

#[derive(Parser)]
#[command(name = "vahan_stats", about = "Vahan vehicle registration ingestion and analytics")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    Init,
    /// Pull the latest report (falls back to alternates, then synthetic data)
    Refresh,
    /// Chart rows, per-category and per-manufacturer metrics
    Registrations {
        /// Inclusive start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Inclusive end date (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Vehicle category (2W, 3W, 4W, or a synonym like "two wheeler")
        #[arg(short, long)]
        category: Option<String>,
        /// Comma-separated manufacturer names
        #[arg(short, long, value_delimiter = ',')]
        manufacturers: Vec<String>,
        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ranked insights over the last year
    Insights {
        #[arg(long)]
        json: bool,
    },
    /// List stored manufacturers
    Manufacturers,
    /// Show dataset statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;

    let result = match cli.command {
        Commands::Init => {
            println!("Schema ready at {}", settings.db_path.display());
            Ok(())
        }
        Commands::Refresh => {
            let source = HttpSource::new().context("Failed to build HTTP client")?;
            let ingestor = Ingestor::new(source, settings, Vocabulary::default());

            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
            pb.set_message("Refreshing registration data...");
            pb.enable_steady_tick(Duration::from_millis(120));

            let today = chrono::Local::now().date_naive();
            let report = ingestor.refresh(&conn, today).await;
            pb.finish_and_clear();
            let report = report?;

            for d in &report.dimensions {
                println!(
                    "{:<13} {:<22} {:>6} extracted {:>6} written",
                    d.dimension, d.provenance.to_string(), d.extracted, d.written
                );
            }
            Ok(())
        }
        Commands::Registrations {
            start,
            end,
            category,
            manufacturers,
            json,
        } => {
            if let (Some(s), Some(e)) = (start, end) {
                if s > e {
                    bail!("--start {} is after --end {}", s, e);
                }
            }
            let category = match category {
                Some(c) => Some(
                    normalize_category(&c, &Vocabulary::default())
                        .with_context(|| format!("Unrecognized category {:?}", c))?,
                ),
                None => None,
            };
            let query = RegistrationQuery {
                start,
                end,
                category,
                manufacturers,
            };
            let report = analytics::compute_registrations(&conn, &query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }
            if report.summary.is_none() && report.manufacturer_metrics.is_empty() {
                println!("No registrations found. Run 'refresh' first.");
                return Ok(());
            }

            println!("{:<8} | {:>12}", "Month", "Total");
            println!("{}", "-".repeat(23));
            for row in &report.chart_rows {
                println!("{:<8} | {:>12}", row.month, row.total);
            }

            print_metrics("Category", &report.category_metrics);
            print_metrics("Manufacturer", &report.manufacturer_metrics);

            if let Some(s) = &report.summary {
                println!(
                    "\n{} registrations from {} to {}",
                    s.total_registrations, s.data_period.start, s.data_period.end
                );
            }
            Ok(())
        }
        Commands::Insights { json } => {
            let insights = analytics::compute_insights(&conn, chrono::Local::now().date_naive())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
                return Ok(());
            }
            if insights.is_empty() {
                println!("No insights for the last 12 months.");
                return Ok(());
            }
            for (i, insight) in insights.iter().enumerate() {
                println!("{}. {}", i + 1, insight.title);
                println!("   {}", insight.description);
            }
            Ok(())
        }
        Commands::Manufacturers => {
            let names = analytics::list_manufacturers(&conn)?;
            for name in &names {
                println!("{}", name);
            }
            println!("\n{} manufacturers", names.len());
            Ok(())
        }
        Commands::Stats => {
            let s = db::get_stats(&conn)?;
            println!("Category rows:     {}", s.category_rows);
            println!("Manufacturer rows: {}", s.manufacturer_rows);
            println!("Manufacturers:     {}", s.manufacturers);
            println!(
                "Latest date:       {}",
                s.latest_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_metrics(label: &str, metrics: &[analytics::GroupMetric]) {
    if metrics.is_empty() {
        return;
    }
    println!(
        "\n{:<24} | {:>12} | {:>8} | {:>8} | {:<6}",
        label, "Total", "YoY %", "QoQ %", "Trend"
    );
    println!("{}", "-".repeat(70));
    for m in metrics {
        println!(
            "{:<24} | {:>12} | {:>8.2} | {:>8.2} | {:<6}",
            truncate(m.name(), 24),
            m.total_registrations,
            m.yoy_change,
            m.qoq_change,
            format!("{:?}", m.trend).to_lowercase()
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max - 3).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
