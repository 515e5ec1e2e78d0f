//! # boundary-shp
//!
//! Chargement des fichiers de limites de Statistique Canada (shapefile) en mémoire.
//!
//! ## Features
//!
//! - Lecture des géométries (`.shp`/`.shx`) et des attributs (`.dbf`)
//! - Identification du système de coordonnées depuis le `.prj` (WKT1/WKT2)
//! - Détection de l'encodage déclaré (`.cpg`)
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use boundary_shp::{load, LoadOptions};
//! use std::path::Path;
//!
//! let table = load(Path::new("lfsa000a21a_e/lfsa000a21a_e.shp"), &LoadOptions::default())?;
//! println!("{} FSA", table.len());
//! println!("CRS: {:?}", table.crs.map(|c| c.to_string()));
//! ```

pub mod attributes;
pub mod crs;
pub mod error;
pub mod prj;
pub mod sidecar;
pub mod types;

pub use attributes::AttributeValue;
pub use crs::{Crs, Ellipsoid, LccParams, Projection, TmParams};
pub use error::BoundaryError;
pub use sidecar::Sidecars;
pub use types::{BoundaryFeature, BoundaryTable};

use std::path::Path;

use geo::Geometry;
use shapefile::Shape;
use tracing::{debug, info, warn};

/// Options de chargement
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// CRS imposé (prioritaire sur le .prj)
    pub crs_override: Option<Crs>,
}

/// Charge un shapefile (ou le dossier qui le contient) en mémoire.
///
/// # Errors
///
/// `BoundaryError::MissingInput` si le chemin n'existe pas, `MissingFile` sans `.dbf`,
/// `RecordMismatch` si le `.shp` et le `.dbf` n'ont pas le même nombre d'enregistrements.
/// Les autres erreurs de lecture sont propagées telles quelles.
pub fn load(path: &Path, options: &LoadOptions) -> Result<BoundaryTable, BoundaryError> {
    // 1. Résoudre le .shp et ses compagnons
    let shp = sidecar::resolve_input(path)?;
    let sidecars = Sidecars::locate(&shp);
    let dbf_path = sidecars.require_dbf()?;

    if sidecars.shx.is_none() {
        warn!(path = %shp.display(), "No .shx index found, reading shapes sequentially");
    }

    // 2. Géométries
    let mut shape_reader = shapefile::ShapeReader::from_path(&shp)?;
    let shape_type = format!("{:?}", shape_reader.header().shape_type);

    let mut geometries = Vec::new();
    for (index, shape) in shape_reader.iter_shapes().enumerate() {
        geometries.push(convert_shape(index, shape?)?);
    }

    // 3. Attributs, dans l'ordre des champs du .dbf, décodés selon le .cpg
    let encoding = match &sidecars.cpg {
        Some(cpg_path) => encoding_from_label(&std::fs::read_to_string(cpg_path)?),
        None => None,
    };
    debug!(encoding = ?encoding.map(|e| e.name()), "Declared attribute encoding");

    let mut dbf = open_dbf(dbf_path, encoding)?;
    let columns: Vec<String> = dbf
        .fields()
        .iter()
        .map(|field| field.name().to_string())
        .filter(|name| name != "DeletionFlag")
        .collect();

    let mut rows = Vec::with_capacity(geometries.len());
    for record in dbf.iter_records() {
        let record = record?;
        let attributes: Vec<AttributeValue> = columns
            .iter()
            .map(|column| {
                record
                    .get(column)
                    .cloned()
                    .map(AttributeValue::from_field)
                    .unwrap_or(AttributeValue::Null)
            })
            .collect();
        rows.push(attributes);
    }

    if geometries.len() != rows.len() {
        return Err(BoundaryError::RecordMismatch {
            shapes: geometries.len(),
            records: rows.len(),
        });
    }

    // 4. Projection
    let crs = match &options.crs_override {
        Some(crs) => Some(crs.clone()),
        None => match &sidecars.prj {
            Some(prj_path) => Some(prj::parse(&std::fs::read_to_string(prj_path)?)?),
            None => {
                warn!(path = %shp.display(), "No .prj file, coordinate reference system unknown");
                None
            }
        },
    };

    let features: Vec<BoundaryFeature> = geometries
        .into_iter()
        .zip(rows)
        .map(|(geometry, attributes)| BoundaryFeature {
            geometry,
            attributes,
        })
        .collect();

    info!(
        path = %shp.display(),
        records = features.len(),
        columns = columns.len(),
        crs = %crs.as_ref().map(|c| c.code()).unwrap_or_else(|| "none".into()),
        "Shapefile loaded"
    );

    Ok(BoundaryTable {
        source: shp,
        columns,
        features,
        crs,
        encoding,
        shape_type,
    })
}

/// Ouvre le .dbf avec l'encodage déclaré (UTF-8 par défaut)
fn open_dbf(
    path: &Path,
    encoding: Option<&'static encoding_rs::Encoding>,
) -> Result<dbase::Reader<std::io::BufReader<std::fs::File>>, BoundaryError> {
    let reader = match encoding {
        Some(encoding) if encoding != encoding_rs::UTF_8 => dbase::Reader::from_path_with_encoding(
            path,
            dbase::encoding::EncodingRs::from(encoding),
        )?,
        _ => dbase::Reader::from_path(path)?,
    };
    Ok(reader)
}

/// Convertit une forme shapefile en géométrie `geo` (None pour une forme nulle)
fn convert_shape(index: usize, shape: Shape) -> Result<Option<Geometry>, BoundaryError> {
    if let Shape::NullShape = shape {
        return Ok(None);
    }

    Geometry::<f64>::try_from(shape)
        .map(Some)
        .map_err(|e| BoundaryError::invalid_geometry(index, e.to_string()))
}

/// Mappe le contenu d'un .cpg vers un encodage
///
/// Accepte les libellés WHATWG ("UTF-8", "ISO-8859-1") et les pages de code
/// numériques ESRI ("1252" -> windows-1252).
pub fn encoding_from_label(label: &str) -> Option<&'static encoding_rs::Encoding> {
    let label = label.trim().trim_start_matches('\u{feff}');
    if label.is_empty() {
        return None;
    }

    encoding_rs::Encoding::for_label(label.as_bytes()).or_else(|| {
        label
            .chars()
            .all(|c| c.is_ascii_digit())
            .then(|| format!("windows-{}", label))
            .and_then(|l| encoding_rs::Encoding::for_label(l.as_bytes()))
    })
}
