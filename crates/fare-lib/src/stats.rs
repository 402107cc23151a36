//! Historical aggregate statistics
//!
//! Read-only tables produced upstream: average fare by hour of day and total
//! trips by day of week. They are used for side-by-side comparison and the
//! dashboard only, never as model input.

use crate::error::{FareError, FareResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct HourRow {
    #[serde(rename = "Hour")]
    hour: i64,
    #[serde(rename = "Avg_Fare")]
    avg_fare: f64,
}

#[derive(Debug, Deserialize)]
struct DayRow {
    #[serde(rename = "Day")]
    day: String,
    #[serde(rename = "Total_Trips")]
    total_trips: u64,
}

/// Average fare at one hour of day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyFare {
    pub hour: u8,
    pub avg_fare: f64,
}

/// Trip volume on one day of week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTrips {
    pub day: String,
    pub total_trips: u64,
}

/// Average historical fare per hour of day, in file order
#[derive(Debug, Clone, Default)]
pub struct HourlyFareTable {
    rows: Vec<HourlyFare>,
}

impl HourlyFareTable {
    pub fn from_path(path: &Path) -> FareResult<Self> {
        let file = File::open(path).map_err(|e| {
            FareError::StatisticsUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse `Hour,Avg_Fare` rows. Each hour may appear at most once.
    pub fn from_reader<R: Read>(reader: R) -> FareResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows: Vec<HourlyFare> = Vec::new();

        for record in csv_reader.deserialize::<HourRow>() {
            let row = record
                .map_err(|e| FareError::StatisticsUnavailable(format!("bad hourly row: {}", e)))?;
            let hour = u8::try_from(row.hour)
                .ok()
                .filter(|h| *h <= 23)
                .ok_or_else(|| {
                    FareError::StatisticsUnavailable(format!("hour {} out of range", row.hour))
                })?;
            if !row.avg_fare.is_finite() {
                return Err(FareError::StatisticsUnavailable(format!(
                    "average fare at hour {} is not finite",
                    hour
                )));
            }
            if rows.iter().any(|r| r.hour == hour) {
                return Err(FareError::StatisticsUnavailable(format!(
                    "hour {} appears more than once",
                    hour
                )));
            }
            rows.push(HourlyFare {
                hour,
                avg_fare: row.avg_fare,
            });
        }

        if rows.is_empty() {
            return Err(FareError::StatisticsUnavailable(
                "hourly fare table is empty".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    /// Build from rows in the given order; later rows for an hour already seen are dropped
    pub fn from_rows(rows: impl IntoIterator<Item = HourlyFare>) -> Self {
        let mut table = Self::default();
        for row in rows {
            if table.avg_fare_at(i32::from(row.hour)).is_none() {
                table.rows.push(row);
            }
        }
        table
    }

    pub fn avg_fare_at(&self, hour: i32) -> Option<f64> {
        self.rows
            .iter()
            .find(|r| i32::from(r.hour) == hour)
            .map(|r| r.avg_fare)
    }

    /// Rows in file order
    pub fn series(&self) -> &[HourlyFare] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Total trip count keyed by day-of-week name, in file order
#[derive(Debug, Clone, Default)]
pub struct DailyTripTable {
    rows: Vec<DailyTrips>,
}

impl DailyTripTable {
    pub fn from_path(path: &Path) -> FareResult<Self> {
        let file = File::open(path).map_err(|e| {
            FareError::StatisticsUnavailable(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> FareResult<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut rows = Vec::new();

        for record in csv_reader.deserialize::<DayRow>() {
            let row = record
                .map_err(|e| FareError::StatisticsUnavailable(format!("bad daily row: {}", e)))?;
            rows.push(DailyTrips {
                day: row.day.trim().to_string(),
                total_trips: row.total_trips,
            });
        }

        if rows.is_empty() {
            return Err(FareError::StatisticsUnavailable(
                "daily trip table is empty".to_string(),
            ));
        }
        Ok(Self { rows })
    }

    pub fn from_rows(rows: impl IntoIterator<Item = DailyTrips>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    pub fn series(&self) -> &[DailyTrips] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// An estimate next to the historical average for the same hour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareComparison {
    pub estimate: f64,
    pub hour: u8,
    pub historical_avg: f64,
    /// `estimate - historical_avg`
    pub difference: f64,
}

/// Headline figures for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    /// Mean of the hourly averages
    pub global_avg_fare: f64,
    pub most_expensive_hour: u8,
    pub busiest_day: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub kpis: Kpis,
    pub fare_by_hour: Vec<HourlyFare>,
    pub trips_by_day: Vec<DailyTrips>,
}

/// Immutable snapshot of the historical tables; either may be missing
#[derive(Debug, Clone, Default)]
pub struct HistoricalStats {
    hourly: Option<HourlyFareTable>,
    daily: Option<DailyTripTable>,
}

impl HistoricalStats {
    pub fn new(hourly: Option<HourlyFareTable>, daily: Option<DailyTripTable>) -> Self {
        Self {
            hourly: hourly.filter(|t| !t.is_empty()),
            daily: daily.filter(|t| !t.is_empty()),
        }
    }

    /// Snapshot with no data; every lookup reports `StatisticsUnavailable`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load both tables. A table that fails to load is left out with a warning.
    pub fn load(hourly_path: &Path, daily_path: &Path) -> Self {
        let hourly = match HourlyFareTable::from_path(hourly_path) {
            Ok(table) => {
                info!(path = %hourly_path.display(), rows = table.len(), "Hourly fare table loaded");
                Some(table)
            }
            Err(e) => {
                warn!(path = %hourly_path.display(), error = %e, "Hourly fare table not loaded");
                None
            }
        };
        let daily = match DailyTripTable::from_path(daily_path) {
            Ok(table) => {
                info!(path = %daily_path.display(), rows = table.rows.len(), "Daily trip table loaded");
                Some(table)
            }
            Err(e) => {
                warn!(path = %daily_path.display(), error = %e, "Daily trip table not loaded");
                None
            }
        };
        Self::new(hourly, daily)
    }

    pub fn hourly(&self) -> Option<&HourlyFareTable> {
        self.hourly.as_ref()
    }

    pub fn daily(&self) -> Option<&DailyTripTable> {
        self.daily.as_ref()
    }

    /// Both tables present
    pub fn is_complete(&self) -> bool {
        self.hourly.is_some() && self.daily.is_some()
    }

    /// Reason the snapshot is incomplete, if it is
    pub fn missing_reason(&self) -> Option<String> {
        match (&self.hourly, &self.daily) {
            (Some(_), Some(_)) => None,
            (None, Some(_)) => Some("hourly fare table unavailable".to_string()),
            (Some(_), None) => Some("daily trip table unavailable".to_string()),
            (None, None) => Some("historical tables unavailable".to_string()),
        }
    }

    /// Compare an estimate with the historical average at the trip hour
    pub fn compare(&self, estimate: f64, hour: i32) -> FareResult<FareComparison> {
        let table = self.hourly.as_ref().ok_or_else(|| {
            FareError::StatisticsUnavailable("hourly fare table unavailable".to_string())
        })?;
        let historical_avg = table.avg_fare_at(hour).ok_or_else(|| {
            FareError::StatisticsUnavailable(format!("no historical fare for hour {}", hour))
        })?;
        let hour = u8::try_from(hour)
            .map_err(|_| FareError::malformed("hour", format!("must be in 0..=23, got {}", hour)))?;

        Ok(FareComparison {
            estimate,
            hour,
            historical_avg,
            difference: estimate - historical_avg,
        })
    }

    pub fn kpis(&self) -> FareResult<Kpis> {
        let (hourly, daily) = self.tables()?;

        let series = hourly.series();
        let global_avg_fare =
            series.iter().map(|r| r.avg_fare).sum::<f64>() / series.len() as f64;

        // First row wins ties
        let most_expensive_hour = series
            .iter()
            .fold(None::<&HourlyFare>, |best, r| match best {
                Some(b) if b.avg_fare >= r.avg_fare => Some(b),
                _ => Some(r),
            })
            .map(|r| r.hour)
            .ok_or_else(|| FareError::StatisticsUnavailable("hourly fare table is empty".to_string()))?;

        let busiest_day = daily
            .series()
            .iter()
            .fold(None::<&DailyTrips>, |best, r| match best {
                Some(b) if b.total_trips >= r.total_trips => Some(b),
                _ => Some(r),
            })
            .map(|r| r.day.clone())
            .ok_or_else(|| FareError::StatisticsUnavailable("daily trip table is empty".to_string()))?;

        Ok(Kpis {
            global_avg_fare,
            most_expensive_hour,
            busiest_day,
        })
    }

    pub fn dashboard(&self) -> FareResult<Dashboard> {
        let kpis = self.kpis()?;
        let (hourly, daily) = self.tables()?;
        Ok(Dashboard {
            kpis,
            fare_by_hour: hourly.series().to_vec(),
            trips_by_day: daily.series().to_vec(),
        })
    }

    fn tables(&self) -> FareResult<(&HourlyFareTable, &DailyTripTable)> {
        match (&self.hourly, &self.daily) {
            (Some(hourly), Some(daily)) => Ok((hourly, daily)),
            _ => Err(FareError::StatisticsUnavailable(
                self.missing_reason().unwrap_or_default(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const HOURLY_CSV: &str = "Hour,Avg_Fare\n0,14.2\n8,11.5\n14,12.0\n17,16.75\n23,15.1\n";
    const DAILY_CSV: &str =
        "Day,Total_Trips\nMonday,1200\nTuesday,1350\nFriday,1980\nSaturday,1750\n";

    fn stats() -> HistoricalStats {
        HistoricalStats::new(
            Some(HourlyFareTable::from_reader(HOURLY_CSV.as_bytes()).unwrap()),
            Some(DailyTripTable::from_reader(DAILY_CSV.as_bytes()).unwrap()),
        )
    }

    #[test]
    fn test_hourly_table_parsing() {
        let table = HourlyFareTable::from_reader(HOURLY_CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.avg_fare_at(14), Some(12.0));
        assert_eq!(table.avg_fare_at(3), None);
        assert_eq!(table.avg_fare_at(-1), None);
    }

    #[test]
    fn test_empty_tables_unavailable() {
        let err = HourlyFareTable::from_reader("Hour,Avg_Fare\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FareError::StatisticsUnavailable(_)));
        let err = DailyTripTable::from_reader("Day,Total_Trips\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FareError::StatisticsUnavailable(_)));
    }

    #[test]
    fn test_out_of_range_hour_rejected() {
        let err = HourlyFareTable::from_reader("Hour,Avg_Fare\n24,10.0\n".as_bytes()).unwrap_err();
        assert!(matches!(err, FareError::StatisticsUnavailable(msg) if msg.contains("24")));
    }

    #[test]
    fn test_compare_with_historical_average() {
        let comparison = stats().compare(13.5, 14).unwrap();
        assert_eq!(comparison.historical_avg, 12.0);
        assert!((comparison.difference - 1.5).abs() < 1e-12);
        assert_eq!(comparison.hour, 14);
    }

    #[test]
    fn test_compare_missing_hour() {
        assert!(matches!(
            stats().compare(13.5, 5),
            Err(FareError::StatisticsUnavailable(_))
        ));
        assert!(matches!(
            HistoricalStats::empty().compare(13.5, 14),
            Err(FareError::StatisticsUnavailable(_))
        ));
    }

    #[test]
    fn test_kpis() {
        let kpis = stats().kpis().unwrap();
        assert!((kpis.global_avg_fare - 69.55 / 5.0).abs() < 1e-9);
        assert_eq!(kpis.most_expensive_hour, 17);
        assert_eq!(kpis.busiest_day, "Friday");
    }

    #[test]
    fn test_kpi_ties_keep_first_row() {
        let stats = HistoricalStats::new(
            Some(HourlyFareTable::from_reader("Hour,Avg_Fare\n9,20.0\n3,20.0\n".as_bytes()).unwrap()),
            Some(DailyTripTable::from_reader("Day,Total_Trips\nSunday,10\nMonday,10\n".as_bytes()).unwrap()),
        );
        let kpis = stats.kpis().unwrap();
        assert_eq!(kpis.most_expensive_hour, 9);
        assert_eq!(kpis.busiest_day, "Sunday");

        let hours: Vec<u8> = stats.dashboard().unwrap().fare_by_hour.iter().map(|r| r.hour).collect();
        assert_eq!(hours, vec![9, 3]);
    }

    #[test]
    fn test_duplicate_hour_rejected() {
        let err = HourlyFareTable::from_reader("Hour,Avg_Fare\n8,11.5\n8,13.0\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, FareError::StatisticsUnavailable(msg) if msg.contains("more than once")));
    }

    #[test]
    fn test_from_rows_keeps_first_entry_per_hour() {
        let table = HourlyFareTable::from_rows([
            HourlyFare { hour: 8, avg_fare: 11.5 },
            HourlyFare { hour: 8, avg_fare: 13.0 },
        ]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.avg_fare_at(8), Some(11.5));
    }

    #[test]
    fn test_dashboard_requires_both_tables() {
        let partial = HistoricalStats::new(
            Some(HourlyFareTable::from_reader(HOURLY_CSV.as_bytes()).unwrap()),
            None,
        );
        assert!(!partial.is_complete());
        assert!(matches!(
            partial.dashboard(),
            Err(FareError::StatisticsUnavailable(msg)) if msg.contains("daily")
        ));
        // Comparison only needs the hourly table
        assert!(partial.compare(10.0, 8).is_ok());
    }

    #[test]
    fn test_dashboard_series() {
        let dashboard = stats().dashboard().unwrap();
        assert_eq!(dashboard.fare_by_hour.len(), 5);
        assert_eq!(dashboard.fare_by_hour[0].hour, 0);
        assert_eq!(dashboard.trips_by_day[2].day, "Friday");
    }

    #[test]
    fn test_load_from_files_with_missing_daily() {
        let temp_dir = TempDir::new().unwrap();
        let hourly_path = temp_dir.path().join("gold_stats_hour.csv");
        let mut file = File::create(&hourly_path).unwrap();
        file.write_all(HOURLY_CSV.as_bytes()).unwrap();

        let stats = HistoricalStats::load(&hourly_path, &temp_dir.path().join("missing.csv"));
        assert!(stats.hourly().is_some());
        assert!(stats.daily().is_none());
        assert_eq!(
            stats.missing_reason().as_deref(),
            Some("daily trip table unavailable")
        );
    }
}
