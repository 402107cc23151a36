//! Taxi Fare Estimator CLI
//!
//! A command-line tool for requesting fare estimates, feeding observed
//! fares to the online model, and managing model artifacts.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use commands::{fare, model};
use fare_lib::{parse_day_of_week, RawFeatures};
use std::path::PathBuf;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_ARTIFACT_PATH: &str = "model/fare_model.json";

/// Taxi Fare Estimator CLI
#[derive(Parser)]
#[command(name = "fare")]
#[command(author, version, about = "CLI for the Taxi Fare Estimator", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via FARE_API_URL env var)
    #[arg(long, env = "FARE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, global = true)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Trip attributes shared by `predict` and `train`
#[derive(Args, Debug, Clone)]
pub struct TripArgs {
    /// Trip distance in kilometres
    #[arg(long)]
    pub km: f64,

    /// Trip duration in minutes
    #[arg(long)]
    pub min: f64,

    /// Hour of day (0-23)
    #[arg(long)]
    pub hour: i32,

    /// Day of week: a name (Monday, tue) or a number, Monday = 0
    #[arg(long, value_parser = parse_day)]
    pub day: i32,
}

impl From<TripArgs> for RawFeatures {
    fn from(args: TripArgs) -> Self {
        RawFeatures::new(args.km, args.min, args.hour, args.day)
    }
}

fn parse_day(input: &str) -> Result<i32, String> {
    parse_day_of_week(input).map_err(|e| e.to_string())
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate the fare of a trip
    Predict(TripArgs),

    /// Teach the model the observed fare of a trip
    Train {
        #[command(flatten)]
        trip: TripArgs,

        /// Fare actually paid
        #[arg(long)]
        fare: f64,
    },

    /// Show historical fare and trip statistics
    Dashboard,

    /// Inspect and manage the fare model
    #[command(subcommand)]
    Model(ModelCommands),
}

#[derive(Subcommand)]
pub enum ModelCommands {
    /// Show the model served by the API
    Show,

    /// Persist the served model to its artifact path
    Save,

    /// Reload the served model from its artifact path
    Reload,

    /// Write an untrained model artifact
    Init {
        /// Artifact file to create
        #[arg(long)]
        path: Option<PathBuf>,

        /// Base learning rate
        #[arg(long, default_value_t = fare_lib::predictor::DEFAULT_LEARNING_RATE)]
        learning_rate: f64,

        /// Decay the learning rate as lr / (t + 1)^power_t
        #[arg(long)]
        power_t: Option<f64>,

        /// L2 shrinkage on the feature weights
        #[arg(long, default_value_t = 0.0)]
        l2: f64,

        /// Overwrite an existing artifact
        #[arg(long)]
        force: bool,
    },

    /// Validate and summarize a model artifact file
    Inspect {
        /// Artifact file to read
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::Config::load()?;

    let format = cli
        .format
        .or_else(|| {
            settings
                .default_format
                .as_deref()
                .and_then(|f| output::OutputFormat::from_str(f, true).ok())
        })
        .unwrap_or_default();
    let api_url = cli
        .api_url
        .or(settings.api_url)
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let artifact_path = |path: Option<PathBuf>| {
        path.or_else(|| settings.artifact_path.as_ref().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACT_PATH))
    };

    match cli.command {
        Commands::Predict(trip) => {
            let client = client::ApiClient::new(&api_url)?;
            fare::predict(&client, trip.into(), format).await?;
        }
        Commands::Train { trip, fare: actual } => {
            let client = client::ApiClient::new(&api_url)?;
            fare::train(&client, trip.into(), actual, format).await?;
        }
        Commands::Dashboard => {
            let client = client::ApiClient::new(&api_url)?;
            fare::dashboard(&client, format).await?;
        }
        Commands::Model(model_cmd) => match model_cmd {
            ModelCommands::Show => {
                let client = client::ApiClient::new(&api_url)?;
                model::show(&client, format).await?;
            }
            ModelCommands::Save => {
                let client = client::ApiClient::new(&api_url)?;
                model::save(&client, format).await?;
            }
            ModelCommands::Reload => {
                let client = client::ApiClient::new(&api_url)?;
                model::reload(&client, format).await?;
            }
            ModelCommands::Init {
                path,
                learning_rate,
                power_t,
                l2,
                force,
            } => {
                let options = model::InitOptions {
                    learning_rate,
                    power_t,
                    l2,
                    force,
                };
                model::init(&artifact_path(path), options, format)?;
            }
            ModelCommands::Inspect { path } => {
                model::inspect(&artifact_path(path), format)?;
            }
        },
    }

    Ok(())
}
