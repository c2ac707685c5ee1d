// src/database/models.rs
use chrono::{DateTime, Utc};

use crate::models::{GeoPoint, Report, StoredReport};

#[derive(Debug, sqlx::FromRow)]
pub(super) struct ReportRow {
    id: i64,
    date: Option<DateTime<Utc>>,
    lat: Option<f64>,
    lon: Option<f64>,
    vessel_id: Option<String>,
    photo: Option<Vec<u8>>,
    comment: Option<String>,
    heading: Option<String>,
    location_typed: Option<String>,
    date_time_typed: Option<String>,
}

impl From<ReportRow> for StoredReport {
    fn from(row: ReportRow) -> Self {
        let location = match (row.lat, row.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint::from_stored(lat, lon)),
            _ => None,
        };

        StoredReport {
            id: row.id,
            report: Report {
                date: row.date,
                location,
                vessel_id: row.vessel_id,
                photo: row.photo,
                comment: row.comment,
                heading: row.heading,
                location_typed: row.location_typed,
                date_time_typed: row.date_time_typed,
            },
        }
    }
}
