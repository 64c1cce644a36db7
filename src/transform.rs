use chrono::SecondsFormat;
use tracing::info;

use crate::batch::RecordBatch;
use crate::config::ConversionConfig;
use crate::error::ConversionError;
use crate::tools::vector;

/// One output attribute column. Time-coded passthrough columns decode to
/// RFC 3339 timestamps; everything else stays numeric.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyColumn {
    Float(Vec<f64>),
    Timestamp(Vec<String>),
}

impl PropertyColumn {
    pub fn len(&self) -> usize {
        match self {
            PropertyColumn::Float(values) => values.len(),
            PropertyColumn::Timestamp(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Insertion-ordered set of output attribute columns. Re-inserting an
/// existing name replaces the column without moving it.
#[derive(Clone, Debug, Default)]
pub struct AttributeTable {
    columns: Vec<(String, PropertyColumn)>,
}

impl AttributeTable {
    pub fn insert(&mut self, name: &str, column: PropertyColumn) {
        match self.columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = column,
            None => self.columns.push((name.to_string(), column)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&PropertyColumn> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, column)| column)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, PropertyColumn)> {
        self.columns.iter()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Applies the config-driven field selection and derivation to a filtered
/// record batch, producing the output attribute table.
///
/// The branches are independent; a config may trigger several. Deriving
/// magnitude/direction from uv replaces the uv passthrough, while deriving
/// uv from the polar pair supplements it. Every configured column must be
/// present in the batch.
pub fn transform_records(
    batch: &RecordBatch,
    config: &ConversionConfig,
) -> Result<AttributeTable, ConversionError> {
    let mut output = AttributeTable::default();

    if let Some(pair) = config.polar_pair() {
        let magnitudes = required_column(batch, pair.magnitude_var)?;
        let directions = required_column(batch, pair.direction_var)?;

        if config.convert_mag_dir {
            info!(
                magnitude_var = pair.magnitude_var,
                direction_var = pair.direction_var,
                "calculating u and v from the polar components"
            );
            output.insert(
                "u",
                PropertyColumn::Float(vector::mag_dir_to_us(magnitudes, directions)),
            );
            output.insert(
                "v",
                PropertyColumn::Float(vector::mag_dir_to_vs(magnitudes, directions)),
            );
        }

        info!(
            magnitude_var = pair.magnitude_var,
            direction_var = pair.direction_var,
            "using the polar components"
        );
        output.insert(
            pair.naming.magnitude_name(),
            PropertyColumn::Float(magnitudes.to_vec()),
        );
        output.insert(
            pair.naming.direction_name(),
            PropertyColumn::Float(directions.to_vec()),
        );
    }

    if let Some((u_var, v_var)) = config.uv_pair() {
        let u = required_column(batch, u_var)?;
        let v = required_column(batch, v_var)?;

        if config.convert_uv {
            let naming = config.polar_naming();
            info!(
                u_var,
                v_var, "calculating magnitude and direction from the uv components"
            );
            output.insert(
                naming.magnitude_name(),
                PropertyColumn::Float(vector::uv_to_magnitudes(u, v)),
            );
            output.insert(
                naming.direction_name(),
                PropertyColumn::Float(vector::uv_to_directions(u, v)),
            );
        } else {
            info!(u_var, v_var, "using the uv components");
            output.insert("u", PropertyColumn::Float(u.to_vec()));
            output.insert("v", PropertyColumn::Float(v.to_vec()));
        }
    }

    for name in &config.extra_vars {
        let values = required_column(batch, name)?;
        info!(var = name.as_str(), "including extra variable");

        let column = match batch.time_coding(name) {
            Some(coding) => PropertyColumn::Timestamp(
                values
                    .iter()
                    .map(|value| {
                        coding
                            .decode(*value)
                            .to_rfc3339_opts(SecondsFormat::Secs, true)
                    })
                    .collect(),
            ),
            None => PropertyColumn::Float(values.to_vec()),
        };
        output.insert(name, column);
    }

    Ok(output)
}

fn required_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a [f64], ConversionError> {
    batch
        .column(name)
        .ok_or_else(|| ConversionError::MissingColumn(name.to_string()))
}
