//! Export vers GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use boundary_shp::{BoundaryFeature, BoundaryTable, Crs};

/// Nom du CRS pour le membre `crs` de la FeatureCollection
pub fn crs_urn(crs: &Crs) -> Option<String> {
    match crs.epsg {
        Some(4326) => Some("urn:ogc:def:crs:OGC:1.3:CRS84".to_string()),
        Some(epsg) => Some(format!("urn:ogc:def:crs:EPSG::{}", epsg)),
        None => None,
    }
}

/// Exporte une table en GeoJSON (streaming avec geozero)
///
/// Retourne le nombre de features écrites. Un fichier existant est remplacé.
pub fn export_to_geojson(table: &BoundaryTable, output_path: &Path) -> Result<usize> {
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    let name = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    write_collection(&mut writer, table, &name)?;
    writer.flush()?;

    Ok(table.len())
}

/// Écrit la FeatureCollection complète
fn write_collection<W: Write>(writer: &mut W, table: &BoundaryTable, name: &str) -> Result<()> {
    // Header FeatureCollection avec nom et CRS
    write!(writer, r#"{{"type":"FeatureCollection","name":"#)?;
    serde_json::to_writer(&mut *writer, name)?;

    if let Some(urn) = table.crs.as_ref().and_then(crs_urn) {
        write!(writer, r#","crs":{{"type":"name","properties":{{"name":"{}"}}}}"#, urn)?;
    }

    write!(writer, r#","features":["#)?;

    for (i, feature) in table.features.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        writeln!(writer)?;
        write_feature(writer, &table.columns, feature)?;
    }

    // Footer
    writeln!(writer, "\n]}}")?;

    Ok(())
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    columns: &[String],
    feature: &BoundaryFeature,
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","properties":{{"#)?;

    // Properties dans l'ordre des colonnes du .dbf
    for (i, (key, value)) in columns.iter().zip(&feature.attributes).enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        serde_json::to_writer(&mut *writer, key)?;
        write!(writer, ":")?;
        serde_json::to_writer(&mut *writer, value)?;
    }

    write!(writer, r#"}},"geometry":"#)?;
    match &feature.geometry {
        Some(geometry) => {
            let mut geom_writer = GeoJsonWriter::new(&mut *writer);
            geometry.process_geom(&mut geom_writer)?;
        }
        None => write!(writer, "null")?,
    }
    write!(writer, "}}")?;

    Ok(())
}
