use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;

/// Resolution of a CF time coordinate's offset unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Seconds => 1.0,
            TimeUnit::Minutes => 60.0,
            TimeUnit::Hours => 3600.0,
            TimeUnit::Days => 86400.0,
        }
    }
}

/// Time encoding parsed from a CF "<unit> since <epoch>" units attribute
#[derive(Clone, Debug)]
pub struct TimeCoding {
    pub epoch: DateTime<Utc>,
    pub unit: TimeUnit,
}

impl TimeCoding {
    /// Parses a CF time units attribute, e.g. "hours since 2023-01-01 00:00:00".
    /// Returns None when the attribute is not a time coding.
    pub fn from_units(units: &str) -> Option<TimeCoding> {
        let pattern = Regex::new(r"(?i)^\s*(second|sec|minute|min|hour|hr|day)s?\s+since\s+(.+?)\s*$").ok()?;
        let captures = pattern.captures(units)?;

        let unit = match captures.get(1)?.as_str().to_lowercase().as_str() {
            "second" | "sec" => TimeUnit::Seconds,
            "minute" | "min" => TimeUnit::Minutes,
            "hour" | "hr" => TimeUnit::Hours,
            "day" => TimeUnit::Days,
            _ => return None,
        };
        let epoch = parse_epoch(captures.get(2)?.as_str())?;

        Some(TimeCoding { epoch, unit })
    }

    /// Decodes a raw offset value into an absolute UTC timestamp
    pub fn decode(&self, value: f64) -> DateTime<Utc> {
        let millis = (value * self.unit.seconds() * 1000.0).round() as i64;
        self.epoch + Duration::milliseconds(millis)
    }
}

fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&datetime));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    None
}

/// Column-oriented tabular projection of a dataset, one row per coordinate
/// tuple. Missing values are NaN.
#[derive(Clone, Debug, Default)]
pub struct RecordBatch {
    names: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
    time_codings: HashMap<String, TimeCoding>,
    rows: usize,
}

impl RecordBatch {
    pub fn new() -> RecordBatch {
        RecordBatch::default()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Column names in insertion order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(|column| column.as_slice())
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.columns.get_mut(name)
    }

    pub fn time_coding(&self, name: &str) -> Option<&TimeCoding> {
        self.time_codings.get(name)
    }

    pub fn set_time_coding(&mut self, name: &str, coding: TimeCoding) {
        self.time_codings.insert(name.to_string(), coding);
    }

    /// Appends a column. Every column must carry the same number of rows.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) {
        if self.names.is_empty() {
            self.rows = values.len();
        }
        debug_assert_eq!(values.len(), self.rows);
        if !self.columns.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.columns.insert(name.to_string(), values);
    }

    /// Drops every row with a NaN in any column, preserving the order of the
    /// surviving rows. Returns the number of dropped rows.
    pub fn drop_incomplete(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.rows)
            .map(|row| {
                self.names
                    .iter()
                    .all(|name| !self.columns[name][row].is_nan())
            })
            .collect();

        let kept = keep.iter().filter(|keep| **keep).count();
        if kept == self.rows {
            return 0;
        }

        for column in self.columns.values_mut() {
            let mut row = 0;
            column.retain(|_| {
                let keep = keep[row];
                row += 1;
                keep
            });
        }

        let dropped = self.rows - kept;
        self.rows = kept;
        dropped
    }

    /// Keeps only the first n rows in their existing order
    pub fn truncate(&mut self, n: usize) {
        if n >= self.rows {
            return;
        }
        for column in self.columns.values_mut() {
            column.truncate(n);
        }
        self.rows = n;
    }
}
