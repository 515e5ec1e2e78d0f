//! Aperçu de la table et rapport de conversion
//!
//! Les statistiques par colonne sont calculées seulement si la colonne existe:
//! une colonne absente est ignorée, jamais une erreur.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use boundary_shp::{AttributeValue, BoundaryTable};
use geo::{BoundingRect, CoordsIter, Geometry};
use regex::Regex;
use serde::{Serialize, Serializer};

/// Largeur maximale d'une cellule de l'aperçu
const MAX_CELL_WIDTH: usize = 30;

/// Abréviation postale d'une province à partir de son PRUID
pub fn province_label(pruid: &str) -> Option<&'static str> {
    match pruid.trim() {
        "10" => Some("NL"),
        "11" => Some("PE"),
        "12" => Some("NS"),
        "13" => Some("NB"),
        "24" => Some("QC"),
        "35" => Some("ON"),
        "46" => Some("MB"),
        "47" => Some("SK"),
        "48" => Some("AB"),
        "59" => Some("BC"),
        "60" => Some("YT"),
        "61" => Some("NT"),
        "62" => Some("NU"),
        _ => None,
    }
}

/// Clé de comptage: les entiers se trient numériquement, avant le texte
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
    Integer(i64),
    Text(String),
}

impl GroupKey {
    /// None pour une valeur nulle
    pub fn from_value(value: &AttributeValue) -> Option<Self> {
        match value {
            AttributeValue::Null => None,
            AttributeValue::Integer(n) => Some(Self::Integer(*n)),
            other => Some(Self::Text(other.to_string())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// Clé d'objet JSON: toujours une chaîne
impl Serialize for GroupKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Vérifie le format d'un code FSA (lettre, chiffre, lettre)
pub fn is_valid_fsa(code: &str) -> bool {
    static FSA: OnceLock<Regex> = OnceLock::new();
    FSA.get_or_init(|| Regex::new(r"^[A-Z]\d[A-Z]$").expect("valid FSA regex"))
        .is_match(code)
}

/// Résumé textuel d'une géométrie pour l'aperçu
pub fn geometry_summary(geometry: Option<&Geometry>) -> String {
    let Some(geometry) = geometry else {
        return "None".to_string();
    };

    let points = geometry.coords_count();
    match geometry {
        Geometry::MultiPolygon(mp) => {
            format!("MultiPolygon({} polygons, {} pts)", mp.0.len(), points)
        }
        Geometry::Polygon(p) => format!("Polygon({} rings, {} pts)", 1 + p.interiors().len(), points),
        Geometry::Point(p) => format!("Point({} {})", p.x(), p.y()),
        Geometry::LineString(_) => format!("LineString({} pts)", points),
        Geometry::MultiLineString(ml) => {
            format!("MultiLineString({} lines, {} pts)", ml.0.len(), points)
        }
        Geometry::MultiPoint(_) => format!("MultiPoint({} pts)", points),
        _ => format!("Geometry({} pts)", points),
    }
}

/// Aperçu des premières lignes d'une table
#[derive(Debug, Clone)]
pub struct TablePreview {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TablePreview {
    /// Construit l'aperçu des `limit` premières lignes
    pub fn new(table: &BoundaryTable, limit: usize) -> Self {
        let mut headers = vec![String::new()];
        headers.extend(table.columns.iter().cloned());
        headers.push("geometry".to_string());

        let rows = table
            .features
            .iter()
            .take(limit)
            .enumerate()
            .map(|(index, feature)| {
                let mut row = vec![index.to_string()];
                row.extend(
                    (0..table.columns.len())
                        .map(|i| feature.attributes.get(i).map(|v| v.to_string()))
                        .map(|v| truncate(&v.unwrap_or_else(|| "None".into()))),
                );
                row.push(geometry_summary(feature.geometry.as_ref()));
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Nombre de lignes affichées
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn truncate(value: &str) -> String {
    if value.chars().count() <= MAX_CELL_WIDTH {
        value.to_string()
    } else {
        let head: String = value.chars().take(MAX_CELL_WIDTH - 3).collect();
        format!("{}...", head)
    }
}

impl fmt::Display for TablePreview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .map(|r| r[i].chars().count())
                    .chain(std::iter::once(h.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let line = |cells: &[String]| -> String {
            cells
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:>width$}", c, width = w))
                .collect::<Vec<_>>()
                .join("  ")
        };

        write!(f, "{}", line(&self.headers))?;
        for row in &self.rows {
            write!(f, "\n{}", line(row))?;
        }
        Ok(())
    }
}

/// Rapport complet de conversion
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversionReport {
    /// Shapefile lu
    pub input: PathBuf,
    /// GeoJSON écrit
    pub output: PathBuf,
    /// Durée de la conversion
    pub duration_secs: f64,

    /// Nombre de features
    pub features: usize,
    /// Colonnes attributaires
    pub columns: Vec<String>,
    /// Géométries nulles
    pub null_geometries: usize,

    /// CRS détecté à la lecture
    pub source_crs: Option<String>,
    /// CRS du fichier produit
    pub target_crs: String,
    /// Reprojection effectuée
    pub reprojected: bool,
    /// Backend de reprojection
    pub backend: String,

    /// Emprise des géométries produites [minx, miny, maxx, maxy]
    pub bbox: Option<[f64; 4]>,
    /// Taille du fichier produit (octets)
    pub output_bytes: u64,
    /// Empreinte blake3 du fichier produit
    pub output_blake3: String,

    /// Nombre de FSA par province (None si la colonne est absente)
    pub by_province: Option<BTreeMap<GroupKey, usize>>,
    /// Premiers codes FSA (None si la colonne est absente)
    pub sample_codes: Option<Vec<String>>,
    /// Codes FSA hors format
    pub malformed_codes: Vec<String>,
}

impl ConversionReport {
    /// Crée un nouveau rapport
    pub fn new(input: &Path, output: &Path) -> Self {
        Self {
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            ..Default::default()
        }
    }

    /// Collecte les statistiques de la table convertie
    pub fn record_table(
        &mut self,
        table: &BoundaryTable,
        province_field: &str,
        code_field: &str,
        sample_size: usize,
    ) {
        self.features = table.len();
        self.columns = table.columns.clone();
        self.null_geometries = table.null_geometries();
        self.bbox = table_bbox(table);
        self.by_province = province_counts(table, province_field);
        self.sample_codes = sample_codes(table, code_field, sample_size);
        self.malformed_codes = malformed_codes(table, code_field);
    }

    /// Enregistre la taille et l'empreinte du fichier produit
    pub fn record_output(&mut self, path: &Path) -> Result<()> {
        self.output_bytes = std::fs::metadata(path)
            .with_context(|| format!("Cannot stat {}", path.display()))?
            .len();
        self.output_blake3 = compute_file_checksum(path)?;
        Ok(())
    }

    /// Définit la durée de la conversion
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Taille du fichier produit en Mo
    pub fn output_megabytes(&self) -> f64 {
        self.output_bytes as f64 / (1024.0 * 1024.0)
    }

    /// Affiche les statistiques sur la console
    pub fn display(&self) {
        println!("\nFSA Statistics:");
        println!("Total FSAs: {}", self.features);

        if let Some(by_province) = &self.by_province {
            println!("FSAs by Province:");
            let width = by_province
                .keys()
                .map(|k| k.to_string().len())
                .max()
                .unwrap_or(0);
            for (key, count) in by_province {
                let pruid = key.to_string();
                match province_label(&pruid) {
                    Some(label) => {
                        println!("  {:<width$}  {:>5}  ({})", pruid, count, label, width = width)
                    }
                    None => println!("  {:<width$}  {:>5}", pruid, count, width = width),
                }
            }
        }

        if let Some(codes) = &self.sample_codes {
            println!("\nSample FSA codes:");
            println!("{:?}", codes);
        }

        if !self.malformed_codes.is_empty() {
            println!(
                "\nMalformed FSA codes ({}): {:?}",
                self.malformed_codes.len(),
                self.malformed_codes.iter().take(10).collect::<Vec<_>>()
            );
        }

        if self.null_geometries > 0 {
            println!("Null geometries: {}", self.null_geometries);
        }
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} → {}: {} features, {} ({}), {:.2} MB in {:.2}s",
            self.input.display(),
            self.output.display(),
            self.features,
            self.target_crs,
            self.backend,
            self.output_megabytes(),
            self.duration_secs
        )
    }
}

/// Comptage par valeur de la colonne province, trié par clé (valeurs nulles ignorées)
pub fn province_counts(table: &BoundaryTable, field: &str) -> Option<BTreeMap<GroupKey, usize>> {
    let values = table.column_values(field)?;
    let mut counts = BTreeMap::new();
    for key in values.filter_map(GroupKey::from_value) {
        *counts.entry(key).or_insert(0) += 1;
    }
    Some(counts)
}

/// Les `n` premiers codes, dans l'ordre des enregistrements
pub fn sample_codes(table: &BoundaryTable, field: &str, n: usize) -> Option<Vec<String>> {
    Some(
        table
            .column_values(field)?
            .take(n)
            .map(|v| v.to_string())
            .collect(),
    )
}

/// Codes présents mais hors format FSA
pub fn malformed_codes(table: &BoundaryTable, field: &str) -> Vec<String> {
    table
        .column_values(field)
        .map(|values| {
            values
                .filter_map(|v| v.as_key())
                .filter(|code| !is_valid_fsa(code))
                .collect()
        })
        .unwrap_or_default()
}

/// Emprise de toutes les géométries non nulles
pub fn table_bbox(table: &BoundaryTable) -> Option<[f64; 4]> {
    table
        .features
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .filter_map(|g| g.bounding_rect())
        .fold(None, |acc: Option<[f64; 4]>, rect| {
            let (min, max) = (rect.min(), rect.max());
            Some(match acc {
                None => [min.x, min.y, max.x, max.y],
                Some([x0, y0, x1, y1]) => [x0.min(min.x), y0.min(min.y), x1.max(max.x), y1.max(max.y)],
            })
        })
}

/// Calcule le checksum blake3 d'un fichier
pub fn compute_file_checksum(path: &Path) -> Result<String> {
    use std::fs::File;
    use std::io::Read;

    let mut file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536]; // 64KB buffer

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize().as_bytes()))
}
