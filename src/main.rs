use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

mod alerts;
mod db;
mod health;
mod insights;
mod models;
mod period;
mod recommend;
mod report;
mod source;

use crate::alerts::AlertThresholds;
use crate::models::GuildId;

#[derive(Parser)]
#[command(name = "guild-pulse")]
#[command(about = "Community analytics and health scoring for Discord guilds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import message records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Compute a guild's composite health score
    Health {
        #[arg(long)]
        guild: GuildId,
        #[arg(long)]
        json: bool,
    },
    /// Summarize a guild's recent activity
    Insights {
        #[arg(long)]
        guild: GuildId,
        #[arg(long, default_value_t = insights::DEFAULT_INSIGHT_DAYS)]
        days: i64,
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the alert rules for a guild
    Alerts {
        #[arg(long)]
        guild: GuildId,
        #[arg(long)]
        json: bool,
    },
    /// Produce actionable recommendations for a guild
    Recommend {
        #[arg(long)]
        guild: GuildId,
        #[arg(long)]
        json: bool,
    },
    /// Generate a full markdown report
    Report {
        #[arg(long)]
        guild: GuildId,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} messages from {}.", csv.display());
        }
        Commands::Health { guild, json } => {
            let store = db::ActivityStore::new(pool);
            let health = health::calculate_health_score(&store, guild).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&health)?);
            } else {
                println!("Health score for guild {guild}: {}/100", health.score);
                println!("  activity    {}", health.components.activity);
                println!("  engagement  {}", health.components.engagement);
                println!("  trend       {}", health.components.trend);
                println!("  consistency {}", health.components.consistency);
                println!("{}", health.interpretation);
            }
        }
        Commands::Insights { guild, days, json } => {
            let store = db::ActivityStore::new(pool);
            let insights = insights::get_insights(&store, guild, days).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&insights)?);
            } else if insights.top_channels.is_empty() {
                println!("No messages recorded for guild {guild} in the last {days} days.");
            } else {
                println!(
                    "Guild {guild}, last {days} days: {} messages, {} active members, {} new.",
                    insights.message_count, insights.active_authors, insights.new_authors
                );
                println!("Top channels:");
                for channel in insights.top_channels.iter() {
                    println!("- channel {}: {} messages", channel.channel_id, channel.count);
                }
                println!("Peak hours (UTC):");
                for slot in insights.peak_slots.iter() {
                    println!("- {}: {} messages", slot.label, slot.count);
                }
            }
        }
        Commands::Alerts { guild, json } => {
            let store = db::ActivityStore::new(pool);
            let alerts =
                alerts::generate_alerts(&store, guild, &AlertThresholds::default()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&alerts)?);
            } else if alerts.is_empty() {
                println!("No alerts for guild {guild}.");
            } else {
                for alert in alerts.iter() {
                    println!(
                        "[{}] {}: {}",
                        alert.level.as_str(),
                        alert.title,
                        alert.description
                    );
                }
            }
        }
        Commands::Recommend { guild, json } => {
            let store = db::ActivityStore::new(pool);
            let recommendations = recommend::generate_recommendations(&store, guild).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&recommendations)?);
            } else if recommendations.is_empty() {
                println!("No recommendations for guild {guild}; things look healthy.");
            } else {
                for rec in recommendations.iter() {
                    println!("{}. {}", rec.priority, rec.title);
                    println!("   {}", rec.description);
                    println!("   Example: {}", rec.example);
                }
            }
        }
        Commands::Report { guild, out } => {
            let store = db::ActivityStore::new(pool);
            let health = health::calculate_health_score(&store, guild).await?;
            let insights =
                insights::get_insights(&store, guild, insights::DEFAULT_INSIGHT_DAYS).await?;
            let alerts =
                alerts::generate_alerts(&store, guild, &AlertThresholds::default()).await?;
            let recommendations = recommend::generate_recommendations(&store, guild).await?;
            let report =
                report::build_report(guild, &health, &insights, &alerts, &recommendations);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
