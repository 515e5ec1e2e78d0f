//! Projection Lambert conique conforme (1SP et 2SP)
//!
//! Utilisée par Statistics Canada Lambert (EPSG:3347) pour les fichiers de limites.

use boundary_shp::{Ellipsoid, LccParams};

use super::Geographic;

/// Lambert conique conforme avec constantes précalculées
#[derive(Debug, Clone, Copy)]
pub struct LambertConic {
    /// Méridien central (radians)
    lon0: f64,
    /// Exposant de la projection
    n: f64,
    /// Constante C
    c: f64,
    /// Rayon à l'origine
    r0: f64,
    x0: f64,
    y0: f64,
    /// Première excentricité
    e: f64,
}

/// Calcule la latitude isométrique
fn isometric_latitude(lat: f64, e: f64) -> f64 {
    let sin_lat = lat.sin();
    let term = ((1.0 - e * sin_lat) / (1.0 + e * sin_lat)).powf(e / 2.0);
    ((std::f64::consts::FRAC_PI_4 + lat / 2.0).tan() * term).ln()
}

/// Calcule la latitude depuis la latitude isométrique (itératif)
fn latitude_from_isometric(iso_lat: f64, e: f64) -> f64 {
    let mut lat = 2.0 * iso_lat.exp().atan() - std::f64::consts::FRAC_PI_2;

    for _ in 0..15 {
        let sin_lat = lat.sin();
        let term = ((1.0 + e * sin_lat) / (1.0 - e * sin_lat)).powf(e / 2.0);
        let new_lat = 2.0 * (iso_lat.exp() * term).atan() - std::f64::consts::FRAC_PI_2;

        if (new_lat - lat).abs() < 1e-12 {
            return new_lat;
        }
        lat = new_lat;
    }
    lat
}

/// Calcule la grande normale (rayon de courbure dans le plan vertical)
fn grande_normale(lat: f64, a: f64, e2: f64) -> f64 {
    a / (1.0 - e2 * lat.sin().powi(2)).sqrt()
}

impl LambertConic {
    pub fn new(params: &LccParams, ellipsoid: &Ellipsoid) -> Self {
        let a = ellipsoid.a;
        let e = ellipsoid.e();
        let e2 = ellipsoid.e2();

        let lat0 = params.lat0.to_radians();
        let lat1 = params.lat1.to_radians();
        let lat2 = params.lat2.to_radians();

        let n1 = grande_normale(lat1, a, e2);
        let iso_lat1 = isometric_latitude(lat1, e);
        let iso_lat0 = isometric_latitude(lat0, e);

        // Exposant de la projection (1SP: un seul parallèle tangent)
        let n = if (lat1 - lat2).abs() < 1e-10 {
            lat1.sin()
        } else {
            let n2 = grande_normale(lat2, a, e2);
            let iso_lat2 = isometric_latitude(lat2, e);
            ((n1 * lat1.cos()).ln() - (n2 * lat2.cos()).ln()) / (iso_lat2 - iso_lat1)
        };

        let c = params.k0 * (n1 * lat1.cos() / n) * (n * iso_lat1).exp();
        let r0 = c * (-n * iso_lat0).exp();

        Self {
            lon0: params.lon0.to_radians(),
            n,
            c,
            r0,
            x0: params.x0,
            y0: params.y0,
            e,
        }
    }

    /// Coordonnées projetées (mètres) vers géographiques
    pub fn inverse(&self, x: f64, y: f64) -> Geographic {
        let dx = x - self.x0;
        let dy = self.r0 - (y - self.y0);

        // Rayon et angle (orientation inversée pour un cône austral)
        let (r, gamma) = if self.n < 0.0 {
            (-(dx.powi(2) + dy.powi(2)).sqrt(), (-dx).atan2(-dy))
        } else {
            ((dx.powi(2) + dy.powi(2)).sqrt(), dx.atan2(dy))
        };

        let iso_lat = -(r / self.c).ln() / self.n;
        let lat = latitude_from_isometric(iso_lat, self.e);
        let lon = self.lon0 + gamma / self.n;

        Geographic::new(lon, lat)
    }

    /// Coordonnées géographiques vers projetées (mètres)
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let r = self.c * (-self.n * isometric_latitude(geo.lat, self.e)).exp();
        let theta = self.n * (geo.lon - self.lon0);

        (
            self.x0 + r * theta.sin(),
            self.y0 + self.r0 - r * theta.cos(),
        )
    }
}
