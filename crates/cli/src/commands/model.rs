//! Model state commands: remote summary/save/reload and local artifact files

use anyhow::{Context, Result};
use colored::Colorize;
use fare_lib::{
    predictor::{LearningRateSchedule, ModelSummary},
    ArtifactStore, ModelArtifact, RegressorConfig, SharedModel,
};
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, ModelStateResponse};
use crate::output::{print_info, print_json, print_success, OutputFormat};

/// Row for the per-field statistics table
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    name: String,
    #[tabled(rename = "Count")]
    count: u64,
    #[tabled(rename = "Mean")]
    mean: String,
    #[tabled(rename = "Std Dev")]
    std_dev: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

/// Hyperparameters for a new local artifact
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    pub learning_rate: f64,
    pub power_t: Option<f64>,
    pub l2: f64,
    pub force: bool,
}

impl InitOptions {
    fn regressor_config(&self) -> RegressorConfig {
        let schedule = match self.power_t {
            Some(power_t) => LearningRateSchedule::InverseScaling { power_t },
            None => LearningRateSchedule::Constant,
        };
        RegressorConfig::default()
            .with_learning_rate(self.learning_rate)
            .with_schedule(schedule)
            .with_l2(self.l2)
    }
}

fn print_summary(summary: &ModelSummary) {
    println!("{}", "Fare Model".bold());
    println!("{}", "=".repeat(50));
    println!("Format version:         {}", summary.format_version);
    println!(
        "Examples seen:          {}",
        summary.examples_seen.to_string().cyan()
    );
    println!("Intercept:              {:.4}", summary.intercept);
    println!("Learning rate:          {}", summary.config.learning_rate);
    match summary.config.schedule {
        LearningRateSchedule::Constant => println!("Schedule:               constant"),
        LearningRateSchedule::InverseScaling { power_t } => {
            println!("Schedule:               inverse scaling (power_t = {})", power_t)
        }
    }
    println!("L2:                     {}", summary.config.l2);
    println!();

    let rows: Vec<FieldRow> = summary
        .fields
        .iter()
        .map(|f| FieldRow {
            name: f.name.clone(),
            count: f.count,
            mean: format!("{:.4}", f.mean),
            std_dev: format!("{:.4}", f.variance.sqrt()),
            weight: format!("{:.4}", f.weight),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_state(action: &str, state: &ModelStateResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(state)?,
        OutputFormat::Table => print_success(&format!(
            "{} {} ({} examples)",
            action, state.path, state.examples_seen
        )),
    }
    Ok(())
}

/// Show the serving model
pub async fn show(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let summary = client.model_summary().await?;
    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => print_summary(&summary),
    }
    Ok(())
}

/// Persist the serving model to its artifact path
pub async fn save(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let state = client.save_model().await?;
    print_state("Saved model to", &state, format)
}

/// Replace the serving model with the artifact on disk
pub async fn reload(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let state = client.reload_model().await?;
    print_state("Reloaded model from", &state, format)
}

/// Write an untrained artifact
pub fn init(path: &Path, options: InitOptions, format: OutputFormat) -> Result<()> {
    let store = ArtifactStore::new(path);
    if store.exists() && !options.force {
        anyhow::bail!(
            "{} already exists, pass --force to overwrite it",
            path.display()
        );
    }

    let artifact = ModelArtifact::fresh(options.regressor_config())
        .context("Invalid model configuration")?;
    store
        .save(&artifact)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let state = ModelStateResponse {
        path: path.display().to_string(),
        examples_seen: 0,
    };
    print_state("Initialized model at", &state, format)?;
    if format == OutputFormat::Table && store.previous_path().exists() {
        print_info(&format!(
            "Previous artifact kept at {}",
            store.previous_path().display()
        ));
    }
    Ok(())
}

/// Validate and summarize an artifact file without a server
pub fn inspect(path: &Path, format: OutputFormat) -> Result<()> {
    let artifact = ArtifactStore::new(path)
        .load()
        .with_context(|| format!("Failed to load {}", path.display()))?;
    let saved_at = artifact.saved_at;
    let summary = SharedModel::from_artifact(artifact)?.summary()?;

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Table => {
            print_summary(&summary);
            println!();
            println!("Saved at: {}", format_timestamp(saved_at).dimmed());
        }
    }
    Ok(())
}

fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}
