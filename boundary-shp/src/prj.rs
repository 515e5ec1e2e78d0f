//! Parser pour les fichiers .prj (WKT) et identification du CRS
//!
//! Gère le WKT1 (variantes OGC et ESRI) et le sous-ensemble à crochets du WKT2.

use std::sync::OnceLock;

use regex::Regex;

use crate::crs::{Crs, Ellipsoid, LccParams, Projection, TmParams, STATCAN_LAMBERT};
use crate::BoundaryError;

/// Mapping des noms de CRS (ESRI et EPSG) vers EPSG
const KNOWN_NAMES: &[(&str, u32)] = &[
    ("GCS_WGS_1984", 4326),
    ("WGS 84", 4326),
    ("WGS84", 4326),
    ("GCS_North_American_1983", 4269),
    ("NAD83", 4269),
    ("GCS_North_American_1927", 4267),
    ("NAD27", 4267),
    ("NAD83_Statistics_Canada_Lambert", 3347),
    ("NAD83 / Statistics Canada Lambert", 3347),
    ("WGS_1984_Web_Mercator_Auxiliary_Sphere", 3857),
    ("WGS 84 / Pseudo-Mercator", 3857),
];

/// Valeur d'un nœud WKT
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    /// Mot-clé nu (ex: `EAST` dans `AXIS["Easting",EAST]`)
    Keyword(String),
    Node(WktNode),
}

/// Nœud WKT: `KEYWORD[arg, ...]`
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

impl WktNode {
    /// Premier argument texte (nom de l'objet)
    pub fn name(&self) -> Option<&str> {
        self.args.iter().find_map(|v| match v {
            WktValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// N-ième argument numérique
    pub fn number(&self, index: usize) -> Option<f64> {
        self.args
            .iter()
            .filter_map(|v| match v {
                WktValue::Number(n) => Some(*n),
                _ => None,
            })
            .nth(index)
    }

    /// Sous-nœuds directs
    pub fn nodes(&self) -> impl Iterator<Item = &WktNode> {
        self.args.iter().filter_map(|v| match v {
            WktValue::Node(n) => Some(n),
            _ => None,
        })
    }

    /// Premier sous-nœud direct portant l'un des mots-clés
    pub fn child(&self, keywords: &[&str]) -> Option<&WktNode> {
        self.nodes()
            .find(|n| keywords.iter().any(|k| n.keyword.eq_ignore_ascii_case(k)))
    }

    /// Recherche en profondeur du premier nœud portant l'un des mots-clés
    pub fn find(&self, keywords: &[&str]) -> Option<&WktNode> {
        for node in self.nodes() {
            if keywords.iter().any(|k| node.keyword.eq_ignore_ascii_case(k)) {
                return Some(node);
            }
            if let Some(found) = node.find(keywords) {
                return Some(found);
            }
        }
        None
    }

    /// Collecte récursive des nœuds PARAMETER (nom normalisé, valeur)
    fn parameters(&self, out: &mut Vec<(String, f64)>) {
        for node in self.nodes() {
            if node.keyword.eq_ignore_ascii_case("PARAMETER") {
                if let (Some(name), Some(value)) = (node.name(), node.number(0)) {
                    out.push((normalize(name), value));
                }
            } else {
                node.parameters(out);
            }
        }
    }
}

/// Parse un fichier .prj et identifie le CRS
pub fn parse(text: &str) -> Result<Crs, BoundaryError> {
    let root = parse_wkt(text)?;
    let mut crs = identify(&root)?;
    crs.wkt = Some(text.trim().trim_start_matches('\u{feff}').to_string());
    Ok(crs)
}

/// Parse le texte WKT en arbre de nœuds
pub fn parse_wkt(text: &str) -> Result<WktNode, BoundaryError> {
    let text = text.trim_start_matches('\u{feff}');
    let mut parser = WktParser {
        input: text.as_bytes(),
        pos: 0,
    };

    parser.skip_ws();
    let node = parser.node()?;
    parser.skip_ws();

    if parser.pos < parser.input.len() {
        return Err(BoundaryError::prj(parser.pos, "trailing content after root node"));
    }

    Ok(node)
}

struct WktParser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl WktParser<'_> {
    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn keyword(&mut self) -> Result<String, BoundaryError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(BoundaryError::prj(start, "expected keyword"));
        }
        Ok(String::from_utf8_lossy(&self.input[start..self.pos]).into_owned())
    }

    fn node(&mut self) -> Result<WktNode, BoundaryError> {
        let keyword = self.keyword()?;
        self.skip_ws();

        let close = match self.peek() {
            Some(b'[') => b']',
            Some(b'(') => b')',
            _ => return Err(BoundaryError::prj(self.pos, format!("expected '[' after {}", keyword))),
        };
        self.pos += 1;

        let mut args = Vec::new();
        loop {
            self.skip_ws();
            if self.peek() == Some(close) && args.is_empty() {
                self.pos += 1;
                break;
            }

            args.push(self.value()?);
            self.skip_ws();

            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b) if b == close => {
                    self.pos += 1;
                    break;
                }
                Some(_) => return Err(BoundaryError::prj(self.pos, "expected ',' or closing bracket")),
                None => return Err(BoundaryError::prj(self.pos, "unexpected end of input")),
            }
        }

        Ok(WktNode { keyword, args })
    }

    fn value(&mut self) -> Result<WktValue, BoundaryError> {
        match self.peek() {
            Some(b'"') => self.text().map(WktValue::Text),
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'+' || b == b'.' => {
                self.number().map(WktValue::Number)
            }
            Some(b) if b.is_ascii_alphabetic() => {
                let save = self.pos;
                let keyword = self.keyword()?;
                self.skip_ws();
                if matches!(self.peek(), Some(b'[') | Some(b'(')) {
                    self.pos = save;
                    self.node().map(WktValue::Node)
                } else {
                    Ok(WktValue::Keyword(keyword))
                }
            }
            Some(_) => Err(BoundaryError::prj(self.pos, "unexpected character")),
            None => Err(BoundaryError::prj(self.pos, "unexpected end of input")),
        }
    }

    fn text(&mut self) -> Result<String, BoundaryError> {
        let start = self.pos;
        self.pos += 1;
        let mut out = Vec::new();

        loop {
            match self.peek() {
                // "" = guillemet échappé (WKT2)
                Some(b'"') if self.input.get(self.pos + 1) == Some(&b'"') => {
                    out.push(b'"');
                    self.pos += 2;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b) => {
                    out.push(b);
                    self.pos += 1;
                }
                None => return Err(BoundaryError::prj(start, "unterminated string")),
            }
        }

        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    fn number(&mut self) -> Result<f64, BoundaryError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.' | b'e' | b'E'))
        {
            self.pos += 1;
        }
        let raw = std::str::from_utf8(&self.input[start..self.pos]).unwrap_or("");
        raw.parse()
            .map_err(|_| BoundaryError::prj(start, format!("invalid number '{}'", raw)))
    }
}

/// Identifie le CRS décrit par l'arbre WKT
pub fn identify(root: &WktNode) -> Result<Crs, BoundaryError> {
    let keyword = root.keyword.to_ascii_uppercase();
    let wkt_name = root.name().unwrap_or("unnamed").to_string();
    let ellipsoid = find_ellipsoid(root).unwrap_or(Ellipsoid::WGS84);

    let (projection, linear_unit) = match keyword.as_str() {
        "GEOGCS" | "GEOGCRS" | "GEODCRS" | "GEOGRAPHICCRS" | "GEODETICCRS" => {
            (Projection::Geographic, 1.0)
        }
        "PROJCS" | "PROJCRS" | "PROJECTEDCRS" => {
            let unit = linear_unit(root);
            (projection_from(root, unit), unit)
        }
        other => {
            return Err(BoundaryError::prj(
                0,
                format!("unsupported CRS keyword {}", other),
            ))
        }
    };

    let epsg = authority_code(root)
        .or_else(|| lookup_name(&wkt_name))
        .or_else(|| utm_from_name(&wkt_name))
        .or_else(|| match &projection {
            Projection::Geographic => geographic_from_datum(root),
            Projection::LambertConformalConic(p) if is_statcan(p, &ellipsoid) => Some(3347),
            _ => None,
        });

    let mut crs = Crs {
        epsg,
        name: wkt_name,
        projection,
        ellipsoid,
        linear_unit,
        wkt: None,
    };

    // Le catalogue fournit un nom lisible, et les paramètres si la méthode
    // n'est pas reconnue dans le WKT
    if let Some(known) = epsg.and_then(|code| Crs::from_epsg(code).ok()) {
        crs.name = known.name;
        if matches!(crs.projection, Projection::Unsupported(_)) {
            crs.projection = known.projection;
            crs.ellipsoid = known.ellipsoid;
            crs.linear_unit = known.linear_unit;
        }
    }

    Ok(crs)
}

/// Normalise un nom WKT: minuscules, séparateurs en '_'
fn normalize(name: &str) -> String {
    name.trim()
        .to_ascii_lowercase()
        .replace(&['(', ')'][..], "")
        .split(|c: char| c == ' ' || c == '-' || c == '_')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn lookup_name(name: &str) -> Option<u32> {
    KNOWN_NAMES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(name))
        .map(|&(_, epsg)| epsg)
}

fn utm_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(NAD_?1983|NAD ?83|WGS_?1984|WGS ?84)[\s/_]*UTM[\s_]zone[\s_](\d{1,2})([NS])$")
            .expect("valid UTM regex")
    })
}

/// Reconnaît les noms de zones UTM ("NAD_1983_UTM_Zone_17N", "WGS 84 / UTM zone 18S")
fn utm_from_name(name: &str) -> Option<u32> {
    let caps = utm_regex().captures(name.trim())?;
    let datum = caps[1].to_ascii_uppercase();
    let zone: u32 = caps[2].parse().ok()?;
    let south = caps[3].eq_ignore_ascii_case("S");

    if !(1..=60).contains(&zone) {
        return None;
    }

    if datum.starts_with("NAD") {
        (!south && zone <= 23).then_some(26900 + zone)
    } else if south {
        Some(32700 + zone)
    } else {
        Some(32600 + zone)
    }
}

/// AUTHORITY["EPSG","3347"] (WKT1) ou ID["EPSG",3347] (WKT2) sur le nœud racine
fn authority_code(root: &WktNode) -> Option<u32> {
    let node = root.child(&["AUTHORITY", "ID"])?;
    if !node.name()?.eq_ignore_ascii_case("EPSG") {
        return None;
    }
    node.args.iter().skip(1).find_map(|v| match v {
        WktValue::Text(s) => s.trim().parse().ok(),
        WktValue::Number(n) if n.fract() == 0.0 && *n > 0.0 => Some(*n as u32),
        _ => None,
    })
}

fn geographic_from_datum(root: &WktNode) -> Option<u32> {
    let datum = normalize(root.find(&["DATUM"])?.name()?);
    if datum.contains("wgs_1984") || datum.contains("wgs84") || datum.contains("world_geodetic_system_1984") {
        Some(4326)
    } else if datum.contains("north_american_1983") || datum.contains("north_american_datum_1983") {
        Some(4269)
    } else if datum.contains("north_american_1927") || datum.contains("north_american_datum_1927") {
        Some(4267)
    } else {
        None
    }
}

fn find_ellipsoid(root: &WktNode) -> Option<Ellipsoid> {
    let node = root.find(&["SPHEROID", "ELLIPSOID"])?;
    Some(Ellipsoid {
        a: node.number(0)?,
        inv_f: node.number(1)?,
    })
}

/// Facteur de l'unité linéaire (mètres par unité)
fn linear_unit(root: &WktNode) -> f64 {
    root.child(&["UNIT", "LENGTHUNIT"])
        .or_else(|| root.find(&["LENGTHUNIT"]))
        .and_then(|u| u.number(0))
        .filter(|f| *f > 0.0)
        .unwrap_or(1.0)
}

fn projection_from(root: &WktNode, unit: f64) -> Projection {
    let method = root
        .find(&["PROJECTION", "METHOD"])
        .and_then(|n| n.name())
        .map(normalize)
        .unwrap_or_default();

    let mut params = Vec::new();
    root.parameters(&mut params);
    let param = |names: &[&str]| {
        params
            .iter()
            .find(|(n, _)| names.contains(&n.as_str()))
            .map(|&(_, v)| v)
    };

    let x0 = param(&["false_easting", "easting_at_false_origin"]).unwrap_or(0.0) * unit;
    let y0 = param(&["false_northing", "northing_at_false_origin"]).unwrap_or(0.0) * unit;
    let lon0 = param(&[
        "central_meridian",
        "longitude_of_origin",
        "longitude_of_natural_origin",
        "longitude_of_false_origin",
        "longitude_of_center",
    ])
    .unwrap_or(0.0);
    let lat0 = param(&[
        "latitude_of_origin",
        "latitude_of_natural_origin",
        "latitude_of_false_origin",
        "latitude_of_center",
    ])
    .unwrap_or(0.0);
    let k0 = param(&["scale_factor", "scale_factor_at_natural_origin"]).unwrap_or(1.0);

    if method.contains("lambert_conformal_conic") || method.contains("lambert_conic_conformal") {
        let lat1 = param(&["standard_parallel_1", "latitude_of_1st_standard_parallel"]);
        let lat2 = param(&["standard_parallel_2", "latitude_of_2nd_standard_parallel"]);
        let one_sp = method.ends_with("1sp") || lat2.is_none();
        let lat1 = lat1.unwrap_or(lat0);

        Projection::LambertConformalConic(LccParams {
            lon0,
            lat0,
            lat1,
            lat2: lat2.unwrap_or(lat1),
            k0: if one_sp { k0 } else { 1.0 },
            x0,
            y0,
        })
    } else if method.contains("transverse_mercator") && !method.contains("south") {
        Projection::TransverseMercator(TmParams {
            lon0,
            lat0,
            k0,
            x0,
            y0,
        })
    } else if method.contains("mercator_auxiliary_sphere") || method.contains("pseudo_mercator") {
        Projection::WebMercator
    } else {
        Projection::Unsupported(method)
    }
}

/// Compare avec la définition Statistics Canada Lambert (EPSG:3347)
fn is_statcan(p: &LccParams, ellipsoid: &Ellipsoid) -> bool {
    let close = |a: f64, b: f64, tol: f64| (a - b).abs() < tol;
    close(p.lon0, STATCAN_LAMBERT.lon0, 1e-6)
        && close(p.lat0, STATCAN_LAMBERT.lat0, 1e-6)
        && close(p.lat1, STATCAN_LAMBERT.lat1, 1e-6)
        && close(p.lat2, STATCAN_LAMBERT.lat2, 1e-6)
        && close(p.x0, STATCAN_LAMBERT.x0, 1e-3)
        && close(p.y0, STATCAN_LAMBERT.y0, 1e-3)
        && close(ellipsoid.inv_f, Ellipsoid::GRS80.inv_f, 1e-6)
}
