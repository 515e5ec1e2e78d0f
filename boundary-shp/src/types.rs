//! Types de données pour le crate boundary-shp

use std::path::PathBuf;

use geo::Geometry;

use crate::attributes::AttributeValue;
use crate::crs::Crs;

static NULL: AttributeValue = AttributeValue::Null;

/// Table de limites chargée en mémoire
#[derive(Debug, Clone)]
pub struct BoundaryTable {
    /// Fichier .shp source
    pub source: PathBuf,

    /// Noms des colonnes attributaires, dans l'ordre du .dbf
    pub columns: Vec<String>,

    /// Enregistrements, dans l'ordre du fichier
    pub features: Vec<BoundaryFeature>,

    /// Système de coordonnées commun à toutes les géométries (None si pas de .prj)
    pub crs: Option<Crs>,

    /// Encodage déclaré par le .cpg, appliqué au texte du .dbf
    pub encoding: Option<&'static encoding_rs::Encoding>,

    /// Type de géométrie déclaré dans l'en-tête .shp
    pub shape_type: String,
}

/// Un enregistrement: géométrie + attributs alignés sur `BoundaryTable::columns`
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Géométrie (None pour une forme nulle)
    pub geometry: Option<Geometry>,

    pub attributes: Vec<AttributeValue>,
}

impl BoundaryTable {
    /// Nombre d'enregistrements
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Position d'une colonne
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Valeurs d'une colonne, dans l'ordre des enregistrements
    pub fn column_values<'a>(
        &'a self,
        name: &str,
    ) -> Option<impl Iterator<Item = &'a AttributeValue> + 'a> {
        let index = self.column_index(name)?;
        Some(
            self.features
                .iter()
                .map(move |f| f.attributes.get(index).unwrap_or(&NULL)),
        )
    }

    /// Nombre de géométries nulles
    pub fn null_geometries(&self) -> usize {
        self.features.iter().filter(|f| f.geometry.is_none()).count()
    }
}
