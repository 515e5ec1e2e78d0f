//! Configuration de la conversion
//!
//! Ordre de priorité: valeurs par défaut < fichier JSON (`--config`) < variables
//! d'environnement (`.env` inclus) < options de la ligne de commande.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Variables d'environnement reconnues
pub const ENV_INPUT: &str = "FSA_INPUT";
pub const ENV_OUTPUT: &str = "FSA_OUTPUT";
pub const ENV_TARGET_CRS: &str = "FSA_TARGET_CRS";
pub const ENV_SOURCE_CRS: &str = "FSA_SOURCE_CRS";
pub const ENV_PRECISION: &str = "FSA_PRECISION";
pub const ENV_REPORT: &str = "FSA_REPORT";

/// Configuration d'une conversion
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Shapefile source (ou dossier le contenant)
    pub input: PathBuf,

    /// Fichier GeoJSON produit
    pub output: PathBuf,

    /// Code EPSG cible
    pub target_epsg: u32,

    /// CRS imposé à la source (remplace le .prj)
    pub source_epsg: Option<u32>,

    /// Décimales conservées sur les coordonnées (None = pleine précision)
    pub precision: Option<u8>,

    /// Nombre de lignes de l'aperçu
    pub preview_rows: usize,

    /// Nombre de codes FSA affichés en exemple
    pub sample_size: usize,

    /// Colonne de la province
    pub province_field: String,

    /// Colonne du code FSA
    pub code_field: String,

    /// Refuser d'écraser un fichier de sortie existant
    pub no_clobber: bool,

    /// Rapport JSON optionnel
    pub report: Option<PathBuf>,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("lfsa000a21a_e/lfsa000a21a_e.shp"),
            output: PathBuf::from("canada_fsa_boundaries.geojson"),
            target_epsg: 4326,
            source_epsg: None,
            precision: None,
            preview_rows: 5,
            sample_size: 10,
            province_field: "PRUID".into(),
            code_field: "CFSAUID".into(),
            no_clobber: false,
            report: None,
        }
    }
}

impl ConvertConfig {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Applique les variables d'environnement du processus
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Applique des variables d'environnement fournies par `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(input) = var(ENV_INPUT) {
            self.input = PathBuf::from(input);
        }
        if let Some(output) = var(ENV_OUTPUT) {
            self.output = PathBuf::from(output);
        }
        if let Some(target) = var(ENV_TARGET_CRS) {
            self.target_epsg =
                parse_epsg(&target).with_context(|| format!("Invalid {}", ENV_TARGET_CRS))?;
        }
        if let Some(source) = var(ENV_SOURCE_CRS) {
            self.source_epsg =
                Some(parse_epsg(&source).with_context(|| format!("Invalid {}", ENV_SOURCE_CRS))?);
        }
        if let Some(precision) = var(ENV_PRECISION) {
            self.precision = Some(
                precision
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid {}: {}", ENV_PRECISION, precision))?,
            );
        }
        if let Some(report) = var(ENV_REPORT) {
            self.report = Some(PathBuf::from(report));
        }

        Ok(())
    }
}

/// Parse un code EPSG: "EPSG:4326", "epsg:4326" ou "4326"
pub fn parse_epsg(value: &str) -> Result<u32> {
    let trimmed = value.trim();
    let code = match trimmed.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &trimmed[5..],
        _ => trimmed,
    };

    match code.trim().parse::<u32>() {
        Ok(epsg) if epsg > 0 => Ok(epsg),
        _ => anyhow::bail!("Invalid EPSG code: '{}'. Expected e.g. EPSG:4326", value),
    }
}
