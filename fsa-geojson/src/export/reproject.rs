//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

#[cfg(feature = "reproject")]
use anyhow::{Context, Result};
#[cfg(feature = "reproject")]
use boundary_shp::Crs;
#[cfg(feature = "reproject")]
use geo::{Coord, Geometry, LineString, MapCoords, Polygon};
#[cfg(feature = "reproject")]
use proj::Proj;

/// Définition PROJ d'un CRS: code EPSG si identifié, sinon WKT du .prj
#[cfg(feature = "reproject")]
fn proj_definition(crs: &Crs) -> Result<String> {
    match (crs.epsg, &crs.wkt) {
        (Some(epsg), _) => Ok(format!("EPSG:{}", epsg)),
        (None, Some(wkt)) => Ok(wkt.clone()),
        (None, None) => anyhow::bail!("No PROJ definition available for {}", crs),
    }
}

/// Reprojection de géométries entre deux systèmes de coordonnées
#[cfg(feature = "reproject")]
pub struct Reprojector {
    proj: Proj,
}

#[cfg(feature = "reproject")]
impl Reprojector {
    /// Crée un nouveau reprojector entre deux CRS
    pub fn new(source: &Crs, target: &Crs) -> Result<Self> {
        let source = proj_definition(source)?;
        let target = proj_definition(target)?;

        // new_known_crs normalise l'ordre des axes (lon, lat)
        let proj = Proj::new_known_crs(&source, &target, None).context(format!(
            "Failed to create projection from {} to {}",
            source, target
        ))?;

        Ok(Self { proj })
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        match geom {
            Geometry::Polygon(p) => Ok(Geometry::Polygon(self.transform_polygon(p)?)),
            Geometry::MultiPolygon(mp) => {
                let polys: Result<Vec<Polygon>> =
                    mp.0.iter().map(|p| self.transform_polygon(p)).collect();
                Ok(Geometry::MultiPolygon(geo::MultiPolygon::new(polys?)))
            }
            Geometry::LineString(ls) => Ok(Geometry::LineString(self.transform_linestring(ls)?)),
            // Autres types: point par point
            other => other.try_map_coords(|c: Coord| {
                let (x, y) = self
                    .proj
                    .convert((c.x, c.y))
                    .context("Coordinate transformation failed")?;
                Ok(Coord { x, y })
            }),
        }
    }

    /// Transforme une LineString (optimisé avec batch conversion)
    fn transform_linestring(&self, ls: &LineString) -> Result<LineString> {
        let mut coords: Vec<(f64, f64)> = ls.0.iter().map(|c| (c.x, c.y)).collect();

        // Transformation batch - beaucoup plus rapide que point par point
        self.proj
            .convert_array(&mut coords)
            .context("Batch coordinate transformation failed")?;

        let result: Vec<Coord> = coords.into_iter().map(|(x, y)| Coord { x, y }).collect();
        Ok(LineString::new(result))
    }

    /// Transforme un Polygon
    fn transform_polygon(&self, p: &Polygon) -> Result<Polygon> {
        let exterior = self.transform_linestring(p.exterior())?;
        let interiors: Result<Vec<LineString>> = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Ok(Polygon::new(exterior, interiors?))
    }
}


// Fonction publique sans feature pour permettre l'utilisation conditionnelle
/// Vérifie si la reprojection PROJ est disponible
pub fn is_available() -> bool {
    cfg!(feature = "reproject")
}
