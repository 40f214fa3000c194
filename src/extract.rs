//! Timeseries extraction from heterogeneous query responses.
//!
//! Query backends return wildly different shapes: a single record with a
//! `timeframe` and array-valued fields, a collection of such records, or a
//! nested analyzer result where the series hide behind a well-known key.
//! This module classifies the decoded value into one of those shapes up
//! front, then normalizes it into the canonical [`TimeseriesData`] form the
//! renderers consume.
//!
//! Extraction failure is recoverable: callers fall back to a raw structured
//! dump of the response.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

/// Maximum number of series kept after extraction. Excess is truncated
/// with a warning rather than failing the whole response.
pub const MAX_SERIES: usize = 10;

/// Well-known keys under which analyzer-style responses nest their series.
const QUERY_PATH_KEYS: &[&str] = &["series", "charts", "data", "result", "results"];

/// Well-known dimension keys checked first when labeling a record's series.
const DIMENSION_KEYS: &[&str] = &["label", "name", "dimension", "group", "host", "service"];

/// The response was not recognizable as timeseries data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotTimeseries;

impl fmt::Display for NotTimeseries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response does not contain timeseries data")
    }
}

impl std::error::Error for NotTimeseries {}

/// One named, ordered numeric sequence within a timeseries result.
///
/// Missing samples are represented as NaN holes, never dropped, so every
/// series stays aligned with the timeframe.
#[derive(Debug, Clone)]
pub struct Series {
    /// Stable key, taken from the field name in the source record.
    pub name: String,
    /// Display name; falls back to `name` when absent.
    pub label: Option<String>,
    pub values: Vec<f64>,
}

impl Series {
    /// The name shown to the user.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    /// Latest non-missing value, if any.
    pub fn latest(&self) -> Option<f64> {
        self.values.iter().rev().copied().find(|v| !v.is_nan())
    }
}

/// Canonical timeseries shape produced by extraction.
///
/// Built fresh per fetch response, never mutated after construction,
/// discarded after rendering. `start <= end` always holds.
#[derive(Debug, Clone)]
pub struct TimeseriesData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: Duration,
    pub series: Vec<Series>,
}

/// Closed classification of the decoded response shape.
///
/// Resolving the shape once up front keeps runtime type inspection out of
/// the extraction pipeline itself.
enum InputShape<'a> {
    /// A single record carrying its own timeframe.
    Record(&'a Map<String, Value>),
    /// A collection of records; the first record's timeframe wins.
    Records(&'a [Value]),
    /// Records nested under one of the well-known query-path keys.
    Nested(&'a Value),
}

fn classify(value: &Value) -> Option<InputShape<'_>> {
    match value {
        Value::Object(map) => {
            if map.contains_key("timeframe") {
                return Some(InputShape::Record(map));
            }
            for key in QUERY_PATH_KEYS {
                if let Some(inner) = map.get(*key) {
                    return Some(InputShape::Nested(inner));
                }
            }
            None
        }
        Value::Array(items) => Some(InputShape::Records(items)),
        _ => None,
    }
}

/// Extract canonical timeseries data from an arbitrary decoded response.
pub fn extract(value: &Value) -> Result<TimeseriesData, NotTimeseries> {
    let records = collect_records(value).ok_or(NotTimeseries)?;

    let mut timeframe: Option<(DateTime<Utc>, DateTime<Utc>, Duration)> = None;
    let mut series: Vec<Series> = Vec::new();
    let mut truncated = 0usize;

    for record in &records {
        if timeframe.is_none() {
            timeframe = record_timeframe(record);
        }

        let label = record_label(record);
        for (field, field_value) in record.iter() {
            if field == "timeframe" || field == "interval" {
                continue;
            }
            let Some(values) = numeric_values(field_value) else {
                continue;
            };
            if values.is_empty() {
                continue;
            }
            if series.len() >= MAX_SERIES {
                truncated += 1;
                continue;
            }
            series.push(Series {
                name: field.clone(),
                label: label.clone(),
                values,
            });
        }
    }

    if truncated > 0 {
        tracing::warn!(
            kept = MAX_SERIES,
            dropped = truncated,
            "too many series in response, truncating"
        );
    }

    let (start, end, interval) = timeframe.ok_or(NotTimeseries)?;
    if series.is_empty() {
        return Err(NotTimeseries);
    }

    // Reversed timeframes are tolerated rather than rejected.
    let (start, end) = if start <= end {
        (start, end)
    } else {
        tracing::debug!("timeframe start after end, swapping");
        (end, start)
    };

    Ok(TimeseriesData {
        start,
        end,
        interval,
        series,
    })
}

/// Flatten the response into a list of record objects, descending through
/// nested query-path keys as needed.
fn collect_records(value: &Value) -> Option<Vec<&Map<String, Value>>> {
    match classify(value)? {
        InputShape::Record(map) => Some(vec![map]),
        InputShape::Records(items) => {
            let mut records = Vec::new();
            for item in items {
                if let Some(nested) = collect_records(item) {
                    records.extend(nested);
                } else if let Value::Object(map) = item {
                    records.push(map);
                }
            }
            if records.is_empty() {
                None
            } else {
                Some(records)
            }
        }
        InputShape::Nested(inner) => match inner {
            Value::Array(_) | Value::Object(_) => collect_records(inner).or_else(|| {
                if let Value::Object(map) = inner {
                    Some(vec![map])
                } else {
                    None
                }
            }),
            _ => None,
        },
    }
}

/// Parse a record's `timeframe`/`interval` pair, if present and well-formed.
fn record_timeframe(record: &Map<String, Value>) -> Option<(DateTime<Utc>, DateTime<Utc>, Duration)> {
    let timeframe = record.get("timeframe")?.as_object()?;
    let start = parse_timestamp(timeframe.get("start")?.as_str()?)?;
    let end = parse_timestamp(timeframe.get("end")?.as_str()?)?;
    let interval = parse_interval(record.get("interval")?)?;
    Some((start, end, interval))
}

/// Parse a timestamp, trying the five known formats in order.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    // RFC 3339, with or without fractional seconds.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // ISO-ish without a zone designator.
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    // Space-separated with an explicit offset.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.with_timezone(&Utc));
    }
    // Space-separated, assumed UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    // Bare date, midnight UTC.
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// Parse an interval: integer nanoseconds encoded as a numeric string,
/// or a bare JSON integer.
fn parse_interval(value: &Value) -> Option<Duration> {
    let nanos = match value {
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    Some(Duration::from_nanos(nanos))
}

/// Coerce an array-valued field into a numeric series.
///
/// Accepts float/int/null elements; null becomes a NaN hole. Any other
/// element type disqualifies the field.
fn numeric_values(value: &Value) -> Option<Vec<f64>> {
    let items = value.as_array()?;
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::Number(n) => values.push(n.as_f64()?),
            Value::Null => values.push(f64::NAN),
            _ => return None,
        }
    }
    Some(values)
}

/// Pick a display label for a record's series.
///
/// First match among the well-known dimension keys wins, else the first
/// string field outside the timeframe, else nothing (series fall back to
/// their own name).
fn record_label(record: &Map<String, Value>) -> Option<String> {
    for key in DIMENSION_KEYS {
        if let Some(Value::String(s)) = record.get(*key) {
            return Some(s.clone());
        }
    }
    for (field, value) in record.iter() {
        if field == "timeframe" || field == "interval" {
            continue;
        }
        if let Value::String(s) = value {
            return Some(s.clone());
        }
    }
    None
}
