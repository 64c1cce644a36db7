use std::collections::HashMap;
use std::path::{Path, PathBuf};

use netcdf::AttributeValue;
use tracing::debug;

use crate::batch::{RecordBatch, TimeCoding};
use crate::error::ConversionError;

/// An opened NetCDF dataset, wrapped for tabular projection
pub struct Dataset {
    file: netcdf::File,
    path: PathBuf,
}

impl Dataset {
    /// Opens a NetCDF file for reading
    pub fn open(path: &Path) -> Result<Dataset, ConversionError> {
        let file = netcdf::open(path).map_err(|source| ConversionError::InputRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Dataset {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flattens the dataset into one row per coordinate tuple.
    ///
    /// The table spans the union of the dimensions used by the numeric data
    /// variables. Each dimension contributes a coordinate column (the 1-D
    /// coordinate variable of the same name when present, the 0-based index
    /// otherwise) and every data variable is broadcast across the full
    /// dimension product. Fill values map to NaN; scale_factor/add_offset
    /// are applied; non-numeric variables are skipped.
    pub fn to_records(&self) -> RecordBatch {
        let mut batch = RecordBatch::new();

        let mut coords: HashMap<String, Vec<f64>> = HashMap::new();
        let mut data_vars: Vec<(String, Vec<String>, Vec<f64>)> = Vec::new();
        let mut codings: Vec<(String, TimeCoding)> = Vec::new();

        for var in self.file.variables() {
            let name = var.name();
            let values = match read_decoded(&var) {
                Some(values) => values,
                None => {
                    debug!(variable = name.as_str(), "skipping non-numeric variable");
                    continue;
                }
            };

            if let Some(units) = attr_string(&var, "units") {
                if let Some(coding) = TimeCoding::from_units(&units) {
                    codings.push((name.clone(), coding));
                }
            }

            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            if dims.len() == 1 && dims[0] == name {
                coords.insert(name, values);
            } else {
                data_vars.push((name, dims, values));
            }
        }

        // Dimensions in use, in file order. A dataset holding only
        // coordinate variables tabularizes over the coordinates themselves.
        let mut dims_in_use: Vec<(String, usize)> = Vec::new();
        for dim in self.file.dimensions() {
            let dim_name = dim.name();
            let used = if data_vars.is_empty() {
                coords.contains_key(&dim_name)
            } else {
                data_vars.iter().any(|(_, dims, _)| dims.contains(&dim_name))
            };
            if used {
                dims_in_use.push((dim_name, dim.len()));
            }
        }

        if data_vars.is_empty() && coords.is_empty() {
            return batch;
        }

        let rows: usize = dims_in_use.iter().map(|(_, len)| *len).product();

        // Row-major strides over the full dimension product
        let mut strides = vec![1usize; dims_in_use.len()];
        for k in (0..dims_in_use.len().saturating_sub(1)).rev() {
            strides[k] = strides[k + 1] * dims_in_use[k + 1].1;
        }
        let dim_index = |row: usize, k: usize| (row / strides[k]) % dims_in_use[k].1;

        // Coordinate columns first, then data variables, as a tabular
        // projection reads naturally
        for (k, (dim_name, _)) in dims_in_use.iter().enumerate() {
            let column: Vec<f64> = match coords.get(dim_name) {
                Some(values) => (0..rows)
                    .map(|row| values.get(dim_index(row, k)).copied().unwrap_or(f64::NAN))
                    .collect(),
                None => (0..rows).map(|row| dim_index(row, k) as f64).collect(),
            };
            batch.push_column(dim_name, column);
        }

        for (name, dims, values) in &data_vars {
            let positions: Vec<usize> = dims
                .iter()
                .filter_map(|d| dims_in_use.iter().position(|(n, _)| n == d))
                .collect();
            let lens: Vec<usize> = positions.iter().map(|p| dims_in_use[*p].1).collect();

            let mut own_strides = vec![1usize; lens.len()];
            for k in (0..lens.len().saturating_sub(1)).rev() {
                own_strides[k] = own_strides[k + 1] * lens[k + 1];
            }

            let column: Vec<f64> = (0..rows)
                .map(|row| {
                    let flat: usize = positions
                        .iter()
                        .zip(own_strides.iter())
                        .map(|(p, stride)| dim_index(row, *p) * stride)
                        .sum();
                    values.get(flat).copied().unwrap_or(f64::NAN)
                })
                .collect();
            batch.push_column(name, column);
        }

        for (name, coding) in codings {
            if batch.contains(&name) {
                batch.set_time_coding(&name, coding);
            }
        }

        batch
    }
}

/// Reads a variable as f64, masking fill values to NaN and applying CF
/// scale_factor/add_offset unpacking. Returns None for variables that do
/// not convert to numbers (char and string types).
fn read_decoded(var: &netcdf::Variable) -> Option<Vec<f64>> {
    let mut values = var.get_values::<f64, _>(..).ok()?;

    let fills: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| attr_f64(var, name))
        .collect();
    let scale = attr_f64(var, "scale_factor").unwrap_or(1.0);
    let offset = attr_f64(var, "add_offset").unwrap_or(0.0);

    if !fills.is_empty() || scale != 1.0 || offset != 0.0 {
        for value in values.iter_mut() {
            if fills.iter().any(|fill| *value == *fill) {
                *value = f64::NAN;
            } else {
                *value = *value * scale + offset;
            }
        }
    }

    Some(values)
}

fn attr_f64(var: &netcdf::Variable, name: &str) -> Option<f64> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Uchar(v) => Some(v as f64),
        AttributeValue::Schar(v) => Some(v as f64),
        AttributeValue::Ushort(v) => Some(v as f64),
        AttributeValue::Short(v) => Some(v as f64),
        AttributeValue::Uint(v) => Some(v as f64),
        AttributeValue::Int(v) => Some(v as f64),
        AttributeValue::Ulonglong(v) => Some(v as f64),
        AttributeValue::Longlong(v) => Some(v as f64),
        AttributeValue::Float(v) => Some(v as f64),
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Str(v) => v.trim().parse().ok(),
        AttributeValue::Floats(v) => v.first().map(|v| *v as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        _ => None,
    }
}

fn attr_string(var: &netcdf::Variable, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(v) => Some(v),
        _ => None,
    }
}
