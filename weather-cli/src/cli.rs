use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use std::path::{Path, PathBuf};
use weather_core::{Config, ObservationStore, Pipeline, summarize, today_utc};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Weather observation log and daily digest")]
pub struct Cli {
    /// Config file to use instead of the platform default.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set API key, location and database path interactively.
    Configure,

    /// Fetch the current observation and append it to the store.
    Ingest,

    /// Print the average temperature and humidity for a day.
    Summary {
        /// UTC day as YYYY-MM-DD; defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Ingest, then summarize the same day.
    Run {
        /// UTC day as YYYY-MM-DD; defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// List the observations stored for a day.
    History {
        /// UTC day as YYYY-MM-DD; defaults to today.
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&config_path),
            Command::Ingest => {
                let mut pipeline = Pipeline::from_config(&load_config(&config_path)?)?;
                let observation = pipeline.run_ingest().await?;
                println!("Stored: {observation}");
                Ok(())
            }
            Command::Summary { date } => {
                let config = load_config(&config_path)?;
                let store = open_store(&config)?;
                let outcome = summarize(&store, date.unwrap_or_else(today_utc))?;
                println!("{outcome}");
                Ok(())
            }
            Command::Run { date } => {
                let mut pipeline = Pipeline::from_config(&load_config(&config_path)?)?;
                let observation = pipeline.run_ingest().await?;
                println!("Stored: {observation}");

                let outcome = pipeline.run_summary(date.unwrap_or_else(today_utc))?;
                println!("{outcome}");
                Ok(())
            }
            Command::History { date } => {
                let config = load_config(&config_path)?;
                let store = open_store(&config)?;
                let date = date.unwrap_or_else(today_utc);

                let observations = store.observations_on(date)?;
                if observations.is_empty() {
                    println!("No observations for {date}");
                }
                for observation in observations {
                    println!("{observation}");
                }
                Ok(())
            }
        }
    }
}

fn load_config(path: &Path) -> Result<Config> {
    let mut config = Config::load_from(path)?;
    config.apply_env()?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn open_store(config: &Config) -> Result<ObservationStore> {
    let path = config.database_path()?;
    ObservationStore::open(&path, config.timeout())
        .with_context(|| format!("Failed to open observation store: {}", path.display()))
}

fn configure(path: &Path) -> Result<()> {
    let mut config = Config::load_from(path)?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    config.location = Text::new("Location:")
        .with_default(&config.location)
        .with_help_message(
            "Use the city name as the API spells it, or set verify_location = false in the config",
        )
        .prompt()
        .context("Failed to read location")?;

    let default_db = config.database_path()?.display().to_string();
    let db = Text::new("Database path:")
        .with_default(&default_db)
        .prompt()
        .context("Failed to read database path")?;
    config.database_path = Some(PathBuf::from(db));

    config.save_to(path)?;
    println!("Saved configuration to {}", path.display());
    Ok(())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}
