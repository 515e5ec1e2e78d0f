//! Types d'erreurs pour le crate boundary-shp

use std::path::PathBuf;

use thiserror::Error;

/// Erreurs pouvant survenir lors du chargement d'un shapefile
#[derive(Debug, Error)]
pub enum BoundaryError {
    /// Le fichier (ou dossier) d'entrée n'existe pas
    #[error("{} not found", .0.display())]
    MissingInput(PathBuf),

    /// Plusieurs shapefiles candidats dans le dossier d'entrée
    #[error("Several shapefiles found in {}: {}", .dir.display(), .candidates.join(", "))]
    AmbiguousInput {
        dir: PathBuf,
        candidates: Vec<String>,
    },

    /// Fichier compagnon obligatoire absent (.dbf)
    #[error("Missing required sidecar file: {0}")]
    MissingFile(String),

    /// Erreur d'I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Erreur de lecture du .shp / .shx
    #[error("Shapefile error: {0}")]
    Shapefile(String),

    /// Erreur de lecture du .dbf
    #[error("dBase error: {0}")]
    Dbase(String),

    /// Nombre de géométries et d'enregistrements différents
    #[error("Record count mismatch: {shapes} shapes but {records} attribute records")]
    RecordMismatch { shapes: usize, records: usize },

    /// Géométrie non convertible
    #[error("Invalid geometry for record {record}: {reason}")]
    InvalidGeometry { record: usize, reason: String },

    /// Fichier .prj illisible
    #[error("Invalid .prj definition at offset {offset}: {reason}")]
    Prj { offset: usize, reason: String },

    /// Code EPSG inconnu du catalogue embarqué
    #[error("Unknown CRS: {0}")]
    UnknownCrs(String),
}

impl BoundaryError {
    /// Crée une erreur de parsing WKT avec contexte
    pub fn prj(offset: usize, reason: impl Into<String>) -> Self {
        Self::Prj {
            offset,
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(record: usize, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            record,
            reason: reason.into(),
        }
    }
}

// Les erreurs des crates shapefile/dbase ne sont pas garanties Send + Sync:
// on conserve leur message pour rester compatible avec anyhow.
impl From<shapefile::Error> for BoundaryError {
    fn from(err: shapefile::Error) -> Self {
        Self::Shapefile(err.to_string())
    }
}

impl From<dbase::Error> for BoundaryError {
    fn from(err: dbase::Error) -> Self {
        Self::Dbase(err.to_string())
    }
}
