//! Fare estimate, training and dashboard commands

use anyhow::Result;
use colored::Colorize;
use fare_lib::{day_name, Dashboard, RawFeatures};
use tabled::{settings::Style, Table, Tabled};

use crate::client::{ApiClient, PredictResponse};
use crate::output::{color_delta, format_currency, print_json, print_success, print_warning, OutputFormat};

/// Row for the fare-by-hour table
#[derive(Tabled)]
struct HourRow {
    #[tabled(rename = "Hour")]
    hour: String,
    #[tabled(rename = "Avg Fare")]
    avg_fare: String,
}

/// Row for the trips-by-day table
#[derive(Tabled)]
struct DayRow {
    #[tabled(rename = "Day")]
    day: String,
    #[tabled(rename = "Trips")]
    trips: u64,
}

fn describe_trip(trip: &RawFeatures) -> String {
    format!(
        "{:.1} km, {:.0} min, {:02}:00 on {}",
        trip.km,
        trip.min,
        trip.hour,
        day_name(trip.day).unwrap_or("?")
    )
}

/// Estimate the fare of a trip and compare it with the historical average
pub async fn predict(client: &ApiClient, trip: RawFeatures, format: OutputFormat) -> Result<()> {
    trip.validate()?;
    let result = client.predict(&trip).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_estimate(&trip, &result),
    }

    Ok(())
}

fn print_estimate(trip: &RawFeatures, result: &PredictResponse) {
    println!("{}", "Fare Estimate".bold());
    println!("{}", "=".repeat(50));
    println!("Trip:                   {}", describe_trip(trip).cyan());
    println!(
        "Estimate:               {}",
        format_currency(result.estimate).green().bold()
    );

    match &result.comparison {
        Some(comparison) => {
            println!(
                "Historical average:     {} ({})",
                format_currency(comparison.historical_avg),
                color_delta(comparison.difference)
            );
        }
        None => {
            if let Some(warning) = &result.warning {
                print_warning(warning);
            }
        }
    }

    println!();
    println!(
        "Model trained on {} examples",
        result.examples_seen.to_string().dimmed()
    );
}

/// Feed one observed trip to the online model
pub async fn train(
    client: &ApiClient,
    trip: RawFeatures,
    actual_fare: f64,
    format: OutputFormat,
) -> Result<()> {
    trip.validate()?;
    if !actual_fare.is_finite() {
        anyhow::bail!("fare must be finite, got {}", actual_fare);
    }

    let result = client.train(trip, actual_fare).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&format!(
                "Learned {} for {}",
                format_currency(actual_fare),
                describe_trip(&trip)
            ));
            println!("Error before update:    {}", format_currency(result.error));
            println!("Examples seen:          {}", result.examples_seen);
        }
    }

    Ok(())
}

/// Show historical KPIs and series
pub async fn dashboard(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.dashboard().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_dashboard(&result),
    }

    Ok(())
}

fn print_dashboard(dashboard: &Dashboard) {
    println!("{}", "Historical Dashboard".bold());
    println!("{}", "=".repeat(50));
    println!(
        "Average fare:           {}",
        format_currency(dashboard.kpis.global_avg_fare).green()
    );
    println!(
        "Most expensive hour:    {}",
        format!("{:02}:00", dashboard.kpis.most_expensive_hour).yellow()
    );
    println!("Busiest day:            {}", dashboard.kpis.busiest_day.cyan());
    println!();

    println!("{}", "Average Fare by Hour".bold());
    let rows: Vec<HourRow> = dashboard
        .fare_by_hour
        .iter()
        .map(|r| HourRow {
            hour: format!("{:02}:00", r.hour),
            avg_fare: format_currency(r.avg_fare),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();

    println!("{}", "Trips by Day".bold());
    let rows: Vec<DayRow> = dashboard
        .trips_by_day
        .iter()
        .map(|r| DayRow {
            day: r.day.clone(),
            trips: r.total_trips,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_trip() {
        let trip = RawFeatures::new(5.0, 15.0, 8, 4);
        assert_eq!(describe_trip(&trip), "5.0 km, 15 min, 08:00 on Friday");
    }
}
