//! Modules d'export (GeoJSON, reprojection PROJ)

pub mod geojson;
pub mod reproject;

pub use self::geojson::export_to_geojson;
