//! Définition et implémentation de la commande de conversion
//!
//! Pipeline: vérification des backends → validation de l'entrée → lecture →
//! inspection → reprojection → export GeoJSON → rapport.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use boundary_shp::{BoundaryError, BoundaryTable, Crs, LoadOptions};
use clap::Args;
use geo::{Coord, Geometry, MapCoords};
use tracing::{debug, info};

use crate::config::{parse_epsg, ConvertConfig};
use crate::report::{ConversionReport, TablePreview};
use crate::reproject_lite::SmartReprojector;

/// Options de la conversion (prioritaires sur l'environnement et le fichier de config)
#[derive(Args, Debug, Default, Clone)]
pub struct ConvertArgs {
    /// Shapefile source or the directory that contains it
    /// [default: lfsa000a21a_e/lfsa000a21a_e.shp]
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output GeoJSON file [default: canada_fsa_boundaries.geojson]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON config file (defaults < config file < FSA_* env vars < flags)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Target CRS (e.g. EPSG:4326, 3857) [default: EPSG:4326]
    #[arg(long, value_parser = parse_epsg)]
    pub target_crs: Option<u32>,

    /// Override the source CRS instead of reading the .prj (e.g. EPSG:3347)
    #[arg(long, value_parser = parse_epsg)]
    pub source_crs: Option<u32>,

    /// Coordinate precision (decimal places). Default: full precision
    #[arg(long)]
    pub precision: Option<u8>,

    /// Number of rows shown in the preview [default: 5]
    #[arg(long)]
    pub preview_rows: Option<usize>,

    /// Number of sample FSA codes printed [default: 10]
    #[arg(long)]
    pub sample_size: Option<usize>,

    /// Province column name [default: PRUID]
    #[arg(long)]
    pub province_field: Option<String>,

    /// FSA code column name [default: CFSAUID]
    #[arg(long)]
    pub code_field: Option<String>,

    /// Refuse to overwrite an existing output file
    #[arg(long)]
    pub no_clobber: bool,

    /// Write a JSON conversion report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

impl ConvertArgs {
    /// Construit la configuration finale: défauts, fichier, environnement puis options
    pub fn resolve(&self) -> Result<ConvertConfig> {
        let mut config = match &self.config {
            Some(path) => ConvertConfig::load(path)?,
            None => ConvertConfig::default(),
        };
        config.apply_env()?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Applique les options de la ligne de commande
    pub fn apply_overrides(&self, config: &mut ConvertConfig) {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(target) = self.target_crs {
            config.target_epsg = target;
        }
        if let Some(source) = self.source_crs {
            config.source_epsg = Some(source);
        }
        if let Some(precision) = self.precision {
            config.precision = Some(precision);
        }
        if let Some(rows) = self.preview_rows {
            config.preview_rows = rows;
        }
        if let Some(size) = self.sample_size {
            config.sample_size = size;
        }
        if let Some(field) = &self.province_field {
            config.province_field = field.clone();
        }
        if let Some(field) = &self.code_field {
            config.code_field = field.clone();
        }
        if self.no_clobber {
            config.no_clobber = true;
        }
        if let Some(report) = &self.report {
            config.report = Some(report.clone());
        }
    }
}

/// Résultat de la reprojection d'une table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReprojectOutcome {
    pub reprojected: bool,
    pub backend: &'static str,
}

/// Exécute la conversion complète
pub fn cmd_convert(config: &ConvertConfig) -> Result<ConversionReport> {
    let started_at = Instant::now();

    // 1. Backends géospatiaux compilés
    check_backends();

    // 2. Validation de l'entrée, avant tout autre travail
    if !config.input.exists() {
        return Err(BoundaryError::MissingInput(config.input.clone()).into());
    }
    if config.no_clobber && config.output.exists() {
        anyhow::bail!(
            "{} already exists (remove it or drop --no-clobber)",
            config.output.display()
        );
    }

    info!(
        input = %config.input.display(),
        output = %config.output.display(),
        target = config.target_epsg,
        "Starting conversion"
    );

    // 3. Lecture
    println!("Reading shapefile...");
    let options = LoadOptions {
        crs_override: config.source_epsg.map(Crs::from_epsg).transpose()?,
    };
    let mut table = boundary_shp::load(&config.input, &options)
        .with_context(|| format!("Failed to load {}", config.input.display()))?;

    // 4. Inspection
    println!("Loaded {} FSA boundaries", table.len());
    println!("Geometry type: {}", table.shape_type);
    println!("Columns: {:?}", table.columns);
    println!("\nSample data:");
    println!("{}", TablePreview::new(&table, config.preview_rows));

    let source_crs = table.crs.as_ref().map(|crs| crs.to_string());
    println!(
        "\nCurrent CRS: {}",
        source_crs.as_deref().unwrap_or("None")
    );

    // 5. Reprojection
    let target = Crs::from_epsg(config.target_epsg)?;
    let outcome = reproject_table(&mut table, &target, config.precision)?;

    // 6. Export
    println!("Saving to {}...", config.output.display());
    let written = crate::export::export_to_geojson(&table, &config.output)?;
    debug!(features = written, "GeoJSON written");

    // 7. Rapport
    let mut report = ConversionReport::new(&config.input, &config.output);
    report.source_crs = source_crs;
    report.target_crs = target.code();
    report.reprojected = outcome.reprojected;
    report.backend = outcome.backend.to_string();
    report.record_table(
        &table,
        &config.province_field,
        &config.code_field,
        config.sample_size,
    );
    report.record_output(&config.output)?;

    println!(
        "Saved successfully! File size: {:.2} MB",
        report.output_megabytes()
    );

    report.set_duration(started_at.elapsed());
    report.display();

    if let Some(path) = &config.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    Ok(report)
}

/// Journalise les backends de reprojection disponibles
fn check_backends() {
    let proj = crate::export::reproject::is_available();
    info!(
        reproject_lite = true,
        proj = proj,
        "Geospatial backends available"
    );
    if !proj {
        debug!("PROJ backend not compiled in (build with --features reproject)");
    }
}

/// Reprojette toutes les géométries de la table vers `target`
///
/// Tout ou rien: les nouvelles géométries sont calculées à part et ne remplacent
/// celles de la table qu'une fois toutes les features transformées.
pub fn reproject_table(
    table: &mut BoundaryTable,
    target: &Crs,
    precision: Option<u8>,
) -> Result<ReprojectOutcome> {
    let Some(source) = table.crs.clone() else {
        anyhow::bail!(
            "Cannot transform naive geometries: {} has no .prj (use --source-crs)",
            table.source.display()
        );
    };

    let reprojector = SmartReprojector::new(&source, target)?;

    if reprojector.is_identity() {
        debug!(crs = %source, "Source already in target CRS, skipping reprojection");
    } else {
        println!("Converting to {}...", target.code());
        info!(
            source = %source,
            target = %target,
            backend = reprojector.description(),
            "Reprojecting"
        );
    }

    if reprojector.is_identity() && precision.is_none() {
        return Ok(ReprojectOutcome {
            reprojected: false,
            backend: reprojector.backend(),
        });
    }

    let mut geometries = Vec::with_capacity(table.len());
    for (index, feature) in table.features.iter().enumerate() {
        let geometry = match &feature.geometry {
            Some(geom) => {
                let transformed = reprojector
                    .transform_geometry(geom)
                    .with_context(|| format!("Failed to reproject record {}", index))?;
                Some(match precision {
                    Some(decimals) => round_geometry_coords(&transformed, decimals),
                    None => transformed,
                })
            }
            None => None,
        };
        geometries.push(geometry);
    }

    for (feature, geometry) in table.features.iter_mut().zip(geometries) {
        feature.geometry = geometry;
    }

    let reprojected = !reprojector.is_identity();
    if reprojected {
        table.crs = Some(target.clone());
    }

    Ok(ReprojectOutcome {
        reprojected,
        backend: reprojector.backend(),
    })
}

/// Arrondit les coordonnées d'une géométrie à la précision spécifiée
fn round_geometry_coords(geom: &Geometry, decimals: u8) -> Geometry {
    let factor = 10_f64.powi(decimals as i32);

    geom.map_coords(|c: Coord| Coord {
        x: (c.x * factor).round() / factor,
        y: (c.y * factor).round() / factor,
    })
}
