//! Reprojection intelligente : reproject_lite en priorité, fallback sur proj
//!
//! Utilise automatiquement la meilleure option disponible.

use super::ReprojectorLite;
use anyhow::Result;
#[cfg(not(feature = "reproject"))]
use anyhow::bail;
use boundary_shp::Crs;
use geo::Geometry;

/// Reprojection intelligente
///
/// Essaie d'abord reproject_lite (pure Rust), puis fallback sur proj si disponible.
pub enum SmartReprojector {
    /// Reprojection légère (pure Rust)
    Lite(ReprojectorLite),
    /// Reprojection via PROJ (si feature activée)
    #[cfg(feature = "reproject")]
    Proj(crate::export::reproject::Reprojector),
    /// Pas de reprojection (source == cible)
    Identity,
}

impl SmartReprojector {
    /// Crée un nouveau reprojector
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        // Pas de reprojection nécessaire
        if source.same_as(target) {
            return Ok(Self::Identity);
        }

        // Essayer reproject_lite d'abord
        if ReprojectorLite::is_supported(source, target) {
            let lite = ReprojectorLite::new(source, target)?;
            return Ok(Self::Lite(lite));
        }

        // Fallback sur proj si disponible
        #[cfg(feature = "reproject")]
        {
            let proj = crate::export::reproject::Reprojector::new(source, target)?;
            return Ok(Self::Proj(proj));
        }

        // Aucune option disponible
        #[cfg(not(feature = "reproject"))]
        bail!(
            "Reprojection {} → {} non supportée.\n\
             Projections supportées (reproject_lite) :\n\
             - Sources: géographique, Lambert conique conforme (EPSG:3347), Mercator transverse (UTM/MTM), Web Mercator\n\
             - Cibles: 4326 (WGS84), 3857 (Web Mercator)\n\
             Pour d'autres projections, compilez avec: cargo build --features reproject",
            source,
            target
        );
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => lite.transform_geometry(geom),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_geometry(geom),
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Nom court du backend (rapport JSON)
    pub fn backend(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Lite(_) => "reproject_lite",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj",
        }
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity (pas de reprojection)",
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let r = SmartReprojector::new(&Crs::wgs84(), &Crs::wgs84()).unwrap();
        assert!(r.is_identity());
        assert_eq!(r.backend(), "identity");
    }

    #[test]
    fn test_identity_by_definition() {
        // .prj sans code EPSG mais équivalent à WGS84
        let mut unnamed = Crs::wgs84();
        unnamed.epsg = None;
        unnamed.name = "GCS_WGS_1984".into();
        let r = SmartReprojector::new(&unnamed, &Crs::wgs84()).unwrap();
        assert!(r.is_identity());
    }

    #[test]
    fn test_lite() {
        let r = SmartReprojector::new(&Crs::from_epsg(3347).unwrap(), &Crs::wgs84()).unwrap();
        assert!(matches!(r, SmartReprojector::Lite(_)));
        assert_eq!(r.description(), "reproject_lite (pure Rust)");
    }

    #[test]
    fn test_statcan_to_3857() {
        let r = SmartReprojector::new(
            &Crs::from_epsg(3347).unwrap(),
            &Crs::from_epsg(3857).unwrap(),
        )
        .unwrap();
        assert!(matches!(r, SmartReprojector::Lite(_)));
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_unsupported_without_proj() {
        let r = SmartReprojector::new(&Crs::wgs84(), &Crs::from_epsg(26917).unwrap());
        assert!(r.is_err());
    }
}
