//! GeoJSON export of blocks on a dimension's geojson list.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use voxmap_render::{DimensionAccumulator, MetadataTables, PointOfInterest};

use crate::error::WorldError;

#[derive(Serialize)]
struct FeatureCollection<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature<'a>>,
}

#[derive(Serialize)]
struct Feature<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Point,
    properties: Properties<'a>,
}

/// World `[x, z]`.
#[derive(Serialize)]
struct Point {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: [i64; 2],
}

#[derive(Serialize)]
struct Properties<'a> {
    dimension: &'static str,
    id: u16,
    data: u8,
    name: &'a str,
    y: i64,
}

fn feature<'a>(
    acc: &DimensionAccumulator,
    tables: &'a MetadataTables,
    point: &PointOfInterest,
) -> Feature<'a> {
    Feature {
        kind: "Feature",
        geometry: Point {
            kind: "Point",
            coordinates: [point.x, point.z],
        },
        properties: Properties {
            dimension: acc.dimension().name(),
            id: point.id,
            data: point.data,
            name: tables.block_name(point.id),
            y: point.y,
        },
    }
}

/// Writes the dimension's points of interest as a FeatureCollection.
///
/// Returns the number of features written.
pub fn write_geojson(
    acc: &DimensionAccumulator,
    tables: &MetadataTables,
    writer: impl Write,
) -> Result<usize, WorldError> {
    let features: Vec<Feature<'_>> = acc
        .points_of_interest()
        .iter()
        .map(|point| feature(acc, tables, point))
        .collect();
    let count = features.len();
    serde_json::to_writer_pretty(
        writer,
        &FeatureCollection {
            kind: "FeatureCollection",
            features,
        },
    )?;
    Ok(count)
}

/// Writes `<out>/voxmap.<dim>.geojson` when the dimension has any points.
pub fn export_geojson(
    acc: &DimensionAccumulator,
    tables: &MetadataTables,
    out_dir: &Path,
) -> Result<Option<PathBuf>, WorldError> {
    if acc.points_of_interest().is_empty() {
        return Ok(None);
    }
    let path = out_dir.join(format!("voxmap.{}.geojson", acc.dimension()));
    let mut writer = BufWriter::new(File::create(&path)?);
    let count = write_geojson(acc, tables, &mut writer)?;
    writer.flush()?;
    tracing::info!(dimension = %acc.dimension(), count, "Wrote {}", path.display());
    Ok(Some(path))
}
