//! # fsa-geojson
//!
//! Conversion des limites des régions de tri d'acheminement (RTA/FSA) de
//! Statistique Canada du format shapefile vers GeoJSON (EPSG:4326).
//!
//! ## Features
//!
//! - Lecture shapefile via `boundary-shp` (géométries, attributs, .prj)
//! - Reprojection pure Rust (Lambert Statistique Canada, UTM/MTM, Web Mercator)
//! - Fallback PROJ avec la feature `reproject` (défaut)
//! - Export GeoJSON en streaming, sortie déterministe
//! - Statistiques par province et rapport JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Conversion par défaut (lfsa000a21a_e/lfsa000a21a_e.shp → canada_fsa_boundaries.geojson)
//! fsa-geojson
//!
//! # Dossier source, précision réduite et rapport JSON
//! fsa-geojson --input ./lfsa000a21a_e/ --precision 6 --report report.json
//! ```

pub mod cli;
pub mod config;
pub mod export;
pub mod report;
pub mod reproject_lite;

pub use cli::{cmd_convert, reproject_table, ConvertArgs};
pub use config::ConvertConfig;
pub use report::{ConversionReport, TablePreview};
