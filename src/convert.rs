use std::fs;
use std::path::{Path, PathBuf};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use tracing::info;

use crate::config::ConversionConfig;
use crate::dataset::Dataset;
use crate::error::ConversionError;
use crate::tools::vector;
use crate::transform::{transform_records, AttributeTable, PropertyColumn};

/// Converts a single NetCDF file into a GeoJSON FeatureCollection on disk.
///
/// The output file takes the input's base name with a .json extension,
/// inside output_dir (created if absent). The collection is staged in a
/// temporary file and renamed into place, so a failed run leaves no
/// partial output. Returns the path of the written file.
pub fn convert_file(
    config: &ConversionConfig,
    input: &Path,
    output_dir: &Path,
    max_records: Option<usize>,
) -> Result<PathBuf, ConversionError> {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let output_file = output_dir.join(format!("{}.json", stem));

    info!(input = %input.display(), "reading dataset");
    let dataset = Dataset::open(input)?;
    let mut batch = dataset.to_records();

    let dropped = batch.drop_incomplete();
    if dropped > 0 {
        info!(dropped, "dropped incomplete records");
    }

    if let Some(max) = max_records {
        batch.truncate(max);
    }

    if config.is360 {
        let lons = batch
            .column_mut(&config.lon_var)
            .ok_or_else(|| ConversionError::MissingColumn(config.lon_var.clone()))?;
        vector::normalize_longitudes(lons);
    }

    let attributes = transform_records(&batch, config)?;

    let lons = batch
        .column(&config.lon_var)
        .ok_or_else(|| ConversionError::MissingColumn(config.lon_var.clone()))?;
    let lats = batch
        .column(&config.lat_var)
        .ok_or_else(|| ConversionError::MissingColumn(config.lat_var.clone()))?;
    let collection = attach_geometry(lons, lats, &attributes);

    fs::create_dir_all(output_dir).map_err(|source| ConversionError::OutputWrite {
        path: output_dir.to_path_buf(),
        source,
    })?;
    write_feature_collection(&collection, output_dir, &output_file)?;

    info!(
        output = %output_file.display(),
        features = collection.features.len(),
        "created GeoJSON output"
    );
    Ok(output_file)
}

/// Builds one Point feature per record from the coordinate columns and the
/// transformed attribute table
fn attach_geometry(lons: &[f64], lats: &[f64], attributes: &AttributeTable) -> FeatureCollection {
    let features = lons
        .iter()
        .zip(lats.iter())
        .enumerate()
        .map(|(row, (lon, lat))| {
            let geometry = Geometry::new(Value::Point(vec![*lon, *lat]));

            let mut properties = JsonObject::new();
            for (name, column) in attributes.iter() {
                let value = match column {
                    PropertyColumn::Float(values) => JsonValue::from(values[row]),
                    PropertyColumn::Timestamp(values) => JsonValue::from(values[row].clone()),
                };
                properties.insert(name.clone(), value);
            }

            Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn write_feature_collection(
    collection: &FeatureCollection,
    output_dir: &Path,
    output_file: &Path,
) -> Result<(), ConversionError> {
    let wrap = |source: std::io::Error| ConversionError::OutputWrite {
        path: output_file.to_path_buf(),
        source,
    };

    let mut staged = tempfile::NamedTempFile::new_in(output_dir).map_err(wrap)?;
    serde_json::to_writer(&mut staged, collection).map_err(|e| wrap(e.into()))?;
    staged.persist(output_file).map_err(|e| wrap(e.error))?;
    Ok(())
}
