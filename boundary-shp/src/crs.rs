//! Systèmes de coordonnées: catalogue EPSG embarqué et paramètres de projection
//!
//! Les angles sont exprimés en degrés décimaux, les distances en mètres.

use std::fmt;

use serde::Serialize;

use crate::BoundaryError;

/// Ellipsoïde de référence
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,
    /// Inverse de l'aplatissement (0 pour une sphère)
    pub inv_f: f64,
}

impl Ellipsoid {
    /// Ellipsoïde WGS84
    pub const WGS84: Self = Self {
        a: 6378137.0,
        inv_f: 298.257223563,
    };

    /// Ellipsoïde GRS80 (NAD83)
    /// Note: Quasi identique à WGS84, différence < 0.1mm
    pub const GRS80: Self = Self {
        a: 6378137.0,
        inv_f: 298.257222101,
    };

    /// Ellipsoïde Clarke 1866 (NAD27)
    pub const CLARKE_1866: Self = Self {
        a: 6378206.4,
        inv_f: 294.978698213898,
    };

    /// Aplatissement
    pub fn f(&self) -> f64 {
        if self.inv_f == 0.0 {
            0.0
        } else {
            1.0 / self.inv_f
        }
    }

    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        let f = self.f();
        2.0 * f - f * f
    }

    /// Première excentricité
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Deuxième excentricité au carré
    pub fn ep2(&self) -> f64 {
        self.e2() / (1.0 - self.e2())
    }
}

/// Paramètres Lambert conique conforme (1SP ou 2SP)
///
/// Pour la variante 1SP, `lat1 == lat2 == lat0` et `k0` porte le facteur d'échelle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LccParams {
    /// Méridien central
    pub lon0: f64,
    /// Latitude origine
    pub lat0: f64,
    /// Premier parallèle standard
    pub lat1: f64,
    /// Deuxième parallèle standard
    pub lat2: f64,
    /// Facteur d'échelle
    pub k0: f64,
    /// False easting
    pub x0: f64,
    /// False northing
    pub y0: f64,
}

/// Paramètres Mercator transverse (UTM, MTM, ...)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TmParams {
    pub lon0: f64,
    pub lat0: f64,
    pub k0: f64,
    pub x0: f64,
    pub y0: f64,
}

impl TmParams {
    /// Paramètres d'une zone UTM
    pub fn utm(zone: u32, south: bool) -> Self {
        Self {
            lon0: zone as f64 * 6.0 - 183.0,
            lat0: 0.0,
            k0: 0.9996,
            x0: 500000.0,
            y0: if south { 10000000.0 } else { 0.0 },
        }
    }
}

/// Méthode de projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Projection {
    /// Coordonnées géographiques (longitude, latitude en degrés)
    Geographic,
    LambertConformalConic(LccParams),
    TransverseMercator(TmParams),
    /// Pseudo-Mercator sphérique (EPSG:3857)
    WebMercator,
    /// Méthode reconnue dans le .prj mais non gérée en pur Rust
    Unsupported(String),
}

/// Système de coordonnées d'une couche
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Crs {
    /// Code EPSG si identifié
    pub epsg: Option<u32>,

    /// Nom lisible (catalogue EPSG ou nom WKT)
    pub name: String,

    pub projection: Projection,

    pub ellipsoid: Ellipsoid,

    /// Mètres par unité linéaire (1.0 pour le mètre)
    pub linear_unit: f64,

    /// Définition WKT d'origine (.prj)
    #[serde(skip)]
    pub wkt: Option<String>,
}

/// Statistics Canada Lambert (EPSG:3347)
pub const STATCAN_LAMBERT: LccParams = LccParams {
    lon0: -91.866666666666667,
    lat0: 63.390675,
    lat1: 49.0,
    lat2: 77.0,
    k0: 1.0,
    x0: 6200000.0,
    y0: 3000000.0,
};

impl Crs {
    /// WGS84 géographique (EPSG:4326)
    pub fn wgs84() -> Self {
        Self::geographic(Some(4326), "WGS 84", Ellipsoid::WGS84)
    }

    /// Construit un CRS géographique
    pub fn geographic(epsg: Option<u32>, name: &str, ellipsoid: Ellipsoid) -> Self {
        Self {
            epsg,
            name: name.to_string(),
            projection: Projection::Geographic,
            ellipsoid,
            linear_unit: 1.0,
            wkt: None,
        }
    }

    /// Construit un CRS depuis le catalogue EPSG embarqué
    pub fn from_epsg(code: u32) -> Result<Self, BoundaryError> {
        let projected = |name: String, projection: Projection, ellipsoid: Ellipsoid| Self {
            epsg: Some(code),
            name,
            projection,
            ellipsoid,
            linear_unit: 1.0,
            wkt: None,
        };

        let crs = match code {
            4326 => Self::wgs84(),
            4269 => Self::geographic(Some(4269), "NAD83", Ellipsoid::GRS80),
            4267 => Self::geographic(Some(4267), "NAD27", Ellipsoid::CLARKE_1866),
            3347 => projected(
                "NAD83 / Statistics Canada Lambert".into(),
                Projection::LambertConformalConic(STATCAN_LAMBERT),
                Ellipsoid::GRS80,
            ),
            3857 => projected(
                "WGS 84 / Pseudo-Mercator".into(),
                Projection::WebMercator,
                Ellipsoid::WGS84,
            ),
            32601..=32660 => projected(
                format!("WGS 84 / UTM zone {}N", code - 32600),
                Projection::TransverseMercator(TmParams::utm(code - 32600, false)),
                Ellipsoid::WGS84,
            ),
            32701..=32760 => projected(
                format!("WGS 84 / UTM zone {}S", code - 32700),
                Projection::TransverseMercator(TmParams::utm(code - 32700, true)),
                Ellipsoid::WGS84,
            ),
            26901..=26923 => projected(
                format!("NAD83 / UTM zone {}N", code - 26900),
                Projection::TransverseMercator(TmParams::utm(code - 26900, false)),
                Ellipsoid::GRS80,
            ),
            _ => return Err(BoundaryError::UnknownCrs(format!("EPSG:{}", code))),
        };

        Ok(crs)
    }

    /// Vérifie le code EPSG
    pub fn is_epsg(&self, code: u32) -> bool {
        self.epsg == Some(code)
    }

    /// Compare deux CRS: par code EPSG si les deux sont identifiés, sinon par définition
    pub fn same_as(&self, other: &Crs) -> bool {
        match (self.epsg, other.epsg) {
            (Some(a), Some(b)) => a == b,
            _ => {
                self.projection == other.projection
                    && self.ellipsoid == other.ellipsoid
                    && self.linear_unit == other.linear_unit
            }
        }
    }

    /// Identifiant court ("EPSG:3347" ou nom WKT)
    pub fn code(&self) -> String {
        match self.epsg {
            Some(epsg) => format!("EPSG:{}", epsg),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.epsg {
            Some(epsg) => write!(f, "EPSG:{} ({})", epsg, self.name),
            None => write!(f, "{} (no EPSG code)", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ellipsoid_constants() {
        // sqrt(E2) WGS84 = 0.0818191908426215
        assert!((Ellipsoid::WGS84.e() - 0.0818191908426215).abs() < 1e-12);
        assert!((Ellipsoid::GRS80.e() - 0.0818191910428158).abs() < 1e-12);
        let sphere = Ellipsoid {
            a: 6378137.0,
            inv_f: 0.0,
        };
        assert_eq!(sphere.e2(), 0.0);
    }

    #[test]
    fn test_from_epsg_catalogue() {
        let statcan = Crs::from_epsg(3347).unwrap();
        assert_eq!(
            statcan.projection,
            Projection::LambertConformalConic(STATCAN_LAMBERT)
        );
        assert_eq!(statcan.ellipsoid, Ellipsoid::GRS80);

        let utm = Crs::from_epsg(26917).unwrap();
        assert_eq!(utm.name, "NAD83 / UTM zone 17N");
        match utm.projection {
            Projection::TransverseMercator(tm) => assert_eq!(tm.lon0, -81.0),
            other => panic!("unexpected projection {:?}", other),
        }

        let south = Crs::from_epsg(32740).unwrap();
        match south.projection {
            Projection::TransverseMercator(tm) => assert_eq!(tm.y0, 10000000.0),
            other => panic!("unexpected projection {:?}", other),
        }
    }

    #[test]
    fn test_unknown_epsg() {
        assert!(matches!(
            Crs::from_epsg(99999),
            Err(BoundaryError::UnknownCrs(_))
        ));
    }

    #[test]
    fn test_same_as() {
        let a = Crs::wgs84();
        let mut b = Crs::wgs84();
        b.epsg = None;
        b.name = "GCS_WGS_1984".into();
        assert!(a.same_as(&b));
        assert!(!a.same_as(&Crs::from_epsg(4269).unwrap()));
    }

    #[test]
    fn test_display() {
        assert_eq!(Crs::wgs84().to_string(), "EPSG:4326 (WGS 84)");
        assert_eq!(Crs::from_epsg(3347).unwrap().code(), "EPSG:3347");
    }
}
