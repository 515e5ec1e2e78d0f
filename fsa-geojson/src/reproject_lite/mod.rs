//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte les systèmes utilisés par les fichiers de limites canadiens :
//! - Lambert conique conforme 1SP/2SP (Statistics Canada Lambert, EPSG:3347)
//! - Mercator transverse (UTM NAD83/WGS84, MTM)
//! - Web Mercator (EPSG:3857)
//! - Géographique (NAD83, WGS84) en passthrough
//!
//! Cibles supportées :
//! - WGS84 (EPSG:4326)
//! - Web Mercator (EPSG:3857)
//!
//! Le changement de datum NAD83 → WGS84 est ignoré (écart submétrique).

mod lambert;
mod mercator;
mod smart;
mod tmerc;

pub use lambert::LambertConic;
pub use smart::SmartReprojector;
pub use tmerc::TransverseMercator;

use anyhow::{bail, Result};
use boundary_shp::{Crs, Projection};
use geo::{Coord, Geometry, MapCoords};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Projection inverse de la source, constantes précalculées
enum Inverse {
    Geographic,
    Lambert(LambertConic),
    TransverseMercator(TransverseMercator),
    WebMercator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Wgs84,
    WebMercator,
}

/// Reprojection légère vers WGS84 ou Web Mercator
pub struct ReprojectorLite {
    inverse: Inverse,
    target: Target,
    /// Mètres par unité linéaire de la source
    unit: f64,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        if !Self::is_supported_source(source) {
            bail!(
                "{} non supporté. Sources supportées: géographique, Lambert conique conforme, \
                 Mercator transverse, Web Mercator",
                source
            );
        }
        let target_kind = match target.epsg {
            Some(4326) => Target::Wgs84,
            Some(3857) => Target::WebMercator,
            _ => bail!("{} non supporté. Cibles supportées: 4326, 3857", target),
        };

        let inverse = match &source.projection {
            Projection::Geographic => Inverse::Geographic,
            Projection::LambertConformalConic(params) => {
                Inverse::Lambert(LambertConic::new(params, &source.ellipsoid))
            }
            Projection::TransverseMercator(params) => {
                Inverse::TransverseMercator(TransverseMercator::new(params, &source.ellipsoid))
            }
            Projection::WebMercator => Inverse::WebMercator,
            Projection::Unsupported(method) => bail!("Projection non supportée: {}", method),
        };

        Ok(Self {
            inverse,
            target: target_kind,
            unit: source.linear_unit,
        })
    }

    /// Vérifie si la source est supportée
    pub fn is_supported_source(crs: &Crs) -> bool {
        !matches!(crs.projection, Projection::Unsupported(_))
    }

    /// Vérifie si la cible est supportée
    pub fn is_supported_target(crs: &Crs) -> bool {
        matches!(crs.epsg, Some(4326) | Some(3857))
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: &Crs, target: &Crs) -> bool {
        Self::is_supported_source(source) && Self::is_supported_target(target)
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        // Étape 1: Source → Géographique
        let geo = self.source_to_geographic(x, y);

        if !geo.lon.is_finite() || !geo.lat.is_finite() {
            bail!("Coordonnée hors du domaine de la projection: ({}, {})", x, y);
        }

        // Étape 2: Géographique → Cible
        Ok(self.geographic_to_target(geo))
    }

    /// Convertit les coordonnées source en géographique
    fn source_to_geographic(&self, x: f64, y: f64) -> Geographic {
        match &self.inverse {
            Inverse::Geographic => Geographic::from_degrees(x, y),
            Inverse::Lambert(lcc) => lcc.inverse(x * self.unit, y * self.unit),
            Inverse::TransverseMercator(tm) => tm.inverse(x * self.unit, y * self.unit),
            Inverse::WebMercator => mercator::web_mercator_to_geographic(x, y),
        }
    }

    /// Convertit les coordonnées géographiques vers la cible
    fn geographic_to_target(&self, geo: Geographic) -> (f64, f64) {
        match self.target {
            Target::Wgs84 => geo.to_degrees(),
            Target::WebMercator => mercator::geographic_to_web_mercator(geo),
        }
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c: Coord| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
