//! Résolution du fichier .shp et de ses fichiers compagnons

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::BoundaryError;

/// Fichiers compagnons d'un shapefile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sidecars {
    /// Index des enregistrements
    pub shx: Option<PathBuf>,

    /// Attributs (obligatoire pour le chargement)
    pub dbf: Option<PathBuf>,

    /// Projection (WKT)
    pub prj: Option<PathBuf>,

    /// Encodage des attributs
    pub cpg: Option<PathBuf>,
}

impl Sidecars {
    /// Localise les compagnons d'un .shp (extension insensible à la casse)
    pub fn locate(shp: &Path) -> Self {
        Self {
            shx: find_sibling(shp, "shx"),
            dbf: find_sibling(shp, "dbf"),
            prj: find_sibling(shp, "prj"),
            cpg: find_sibling(shp, "cpg"),
        }
    }

    /// Retourne le .dbf ou une erreur
    pub fn require_dbf(&self) -> Result<&Path, BoundaryError> {
        self.dbf
            .as_deref()
            .ok_or_else(|| BoundaryError::MissingFile("dbf".into()))
    }
}

/// Résout le chemin d'entrée vers un fichier .shp
///
/// Un dossier doit contenir exactement un .shp.
pub fn resolve_input(path: &Path) -> Result<PathBuf, BoundaryError> {
    if !path.exists() {
        return Err(BoundaryError::MissingInput(path.to_path_buf()));
    }

    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }

    let pattern = format!(
        "{}/*.[sS][hH][pP]",
        glob::Pattern::escape(&path.to_string_lossy())
    );
    let mut candidates: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| BoundaryError::Io(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();
    candidates.sort();

    debug!(dir = %path.display(), count = candidates.len(), "Shapefile candidates");

    match candidates.len() {
        0 => Err(BoundaryError::MissingInput(path.join("*.shp"))),
        1 => Ok(candidates.remove(0)),
        _ => Err(BoundaryError::AmbiguousInput {
            dir: path.to_path_buf(),
            candidates: candidates
                .iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .collect(),
        }),
    }
}

/// Cherche `<stem>.<ext>` à côté du .shp, en minuscules ou majuscules
fn find_sibling(shp: &Path, ext: &str) -> Option<PathBuf> {
    [ext.to_ascii_lowercase(), ext.to_ascii_uppercase()]
        .iter()
        .map(|e| shp.with_extension(e))
        .find(|p| p.is_file())
}
