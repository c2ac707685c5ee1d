//! Data models.

use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

use base64::Engine;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use tracing::warn;

use crate::config::{DisplayTimezone, MalformedInputPolicy};
use crate::errors::TrawlTrackerError;

/// Collection every report lands in unless the submitter names another
pub const DEFAULT_REPORT_COLLECTION_NAME: &str = "default_report_collection";

/// Upper bound on the number of reports returned by a listing
pub const REPORT_LIST_LIMIT: u32 = 100;

/// Key of the collection grouping a set of reports.
///
/// All reports of a collection share one partition of the store, so a
/// listing of the collection is a consistent, ordered snapshot. The price is
/// a low sustained write rate to any single collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    name: String,
}

impl CollectionKey {
    pub const KIND: &'static str = "ReportCollection";

    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Collection name, used as the partition value in storage
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for CollectionKey {
    fn default() -> Self {
        Self::new(DEFAULT_REPORT_COLLECTION_NAME)
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", Self::KIND, self.name)
    }
}

/// Geographic point in WGS84 decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl TryFrom<(f64, f64)> for GeoPoint {
    type Error = TrawlTrackerError;

    fn try_from((lat, lon): (f64, f64)) -> Result<Self, Self::Error> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(TrawlTrackerError::InvalidLocation { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

impl GeoPoint {
    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Rebuild a point read back from storage, where it was validated on write
    pub(crate) fn from_stored(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A single report of a spotted trawler
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Report {
    pub date: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub vessel_id: Option<String>,
    /// Photo bytes exactly as uploaded
    pub photo: Option<Vec<u8>>,
    pub comment: Option<String>,
    /// Direction of travel as typed by the reporter
    pub heading: Option<String>,
    /// Typed location, when GPS was unavailable
    pub location_typed: Option<String>,
    /// Typed date and time, when different from the submission time
    pub date_time_typed: Option<String>,
}

/// Report read back from storage, with its assigned id
#[derive(Debug, Clone, PartialEq)]
pub struct StoredReport {
    pub id: i64,
    pub report: Report,
}

/// Serializable projection of a stored report, shared by the HTML list and
/// the JSON feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(rename = "long", skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    pub vessel_id: Option<String>,
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_to_img: Option<String>,
    pub heading: Option<String>,
    pub location_typed: Option<String>,
    pub date_time_typed: Option<String>,
}

impl ReportView {
    pub fn project(stored: &StoredReport, timezone: DisplayTimezone) -> Self {
        let report = &stored.report;
        let has_photo = report.photo.as_ref().is_some_and(|p| !p.is_empty());

        Self {
            date: report.date.as_ref().map(|d| timezone.format(d)),
            lat: report.location.map(|l| l.lat()),
            lon: report.location.map(|l| l.lon()),
            vessel_id: report.vessel_id.clone(),
            comment: report.comment.clone(),
            path_to_img: has_photo.then(|| image_path(stored.id)),
            heading: report.heading.clone(),
            location_typed: report.location_typed.clone(),
            date_time_typed: report.date_time_typed.clone(),
        }
    }
}

/// Relative path fetching the photo of a report
pub fn image_path(id: i64) -> String {
    format!("img?img_id={}", id)
}

/// Raw fields of a submission, text or binary.
///
/// When a field name repeats, the first value is kept.
#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    fields: HashMap<String, Vec<u8>>,
}

impl SubmissionForm {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    /// Field as text, absent and empty fields are both `None`
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .filter(|v| !v.is_empty())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    /// Field as bytes, absent and empty fields are both `None`
    pub fn bytes(&self, name: &str) -> Option<&[u8]> {
        self.fields
            .get(name)
            .map(Vec::as_slice)
            .filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<Vec<u8>>> FromIterator<(K, V)> for SubmissionForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = Self::default();
        for (name, value) in iter {
            form.insert(name, value);
        }
        form
    }
}

/// A parsed submission, ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub collection: CollectionKey,
    pub report: Report,
}

impl Submission {
    /// Parse submitted form fields into a report.
    ///
    /// Recognised fields:
    /// - `report_collection_name`: collection to store into
    /// - `date`: epoch timestamp in seconds, may be fractional
    /// - `lat`, `long`: decimal degrees, only stored when both are given
    /// - `img`: photo bytes
    /// - `encodedImg`: base64 photo, used only when `img` is absent
    /// - `vessel_id`, `heading`, `location_typed`, `date_time_typed`,
    ///   `comment`: stored verbatim, empty when absent
    ///
    /// Malformed `date`, `lat`/`long` or `encodedImg` values either fail
    /// the whole submission or are dropped, depending on `policy`.
    pub fn parse(
        form: &SubmissionForm,
        policy: MalformedInputPolicy,
    ) -> Result<Self, TrawlTrackerError> {
        let collection = form
            .text("report_collection_name")
            .map(CollectionKey::new)
            .unwrap_or_default();

        let date = match form.text("date") {
            Some(value) => apply_policy(parse_epoch_seconds(&value), policy)?,
            None => None,
        };

        let location = match (form.text("lat"), form.text("long")) {
            (Some(lat), Some(lon)) => apply_policy(parse_location(&lat, &lon), policy)?,
            _ => None,
        };

        let photo = match form.bytes("img") {
            Some(bytes) => Some(bytes.to_vec()),
            None => match form.text("encodedImg") {
                Some(encoded) => apply_policy(decode_image(&encoded), policy)?,
                None => None,
            },
        };

        let text = |name: &str| Some(form.text(name).unwrap_or_default());

        Ok(Self {
            collection,
            report: Report {
                date,
                location,
                vessel_id: text("vessel_id"),
                photo,
                comment: text("comment"),
                heading: text("heading"),
                location_typed: text("location_typed"),
                date_time_typed: text("date_time_typed"),
            },
        })
    }
}

fn apply_policy<T>(
    parsed: Result<T, TrawlTrackerError>,
    policy: MalformedInputPolicy,
) -> Result<Option<T>, TrawlTrackerError> {
    match (parsed, policy) {
        (Ok(value), _) => Ok(Some(value)),
        (Err(e), MalformedInputPolicy::Reject) => Err(e),
        (Err(e), MalformedInputPolicy::Ignore) => {
            warn!("Dropping malformed field: {}", e);
            Ok(None)
        }
    }
}

fn parse_float(field: &'static str, value: &str) -> Result<f64, TrawlTrackerError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TrawlTrackerError::MalformedField {
            field,
            value: value.to_string(),
        })
}

/// Years representable as four-digit dates; stored dates sort as text
const DATE_YEARS: RangeInclusive<i32> = 1..=9999;

fn parse_epoch_seconds(value: &str) -> Result<DateTime<Utc>, TrawlTrackerError> {
    let seconds = parse_float("date", value)?;
    DateTime::from_timestamp_micros((seconds * 1e6).round() as i64)
        .filter(|date| DATE_YEARS.contains(&date.year()))
        .ok_or_else(|| TrawlTrackerError::MalformedField {
            field: "date",
            value: value.to_string(),
        })
}

fn parse_location(lat: &str, lon: &str) -> Result<GeoPoint, TrawlTrackerError> {
    let lat = parse_float("lat", lat)?;
    let lon = parse_float("long", lon)?;
    GeoPoint::try_from((lat, lon))
}

fn decode_image(encoded: &str) -> Result<Vec<u8>, TrawlTrackerError> {
    // URL-encoded bodies turn '+' into ' '
    let cleaned: String = encoded
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|_| TrawlTrackerError::MalformedField {
            field: "encodedImg",
            value: truncate(encoded, 32),
        })
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
