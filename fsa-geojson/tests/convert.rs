//! Tests de bout en bout du binaire fsa-geojson sur des shapefiles synthétiques

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use dbase::{FieldValue, Record, TableWriterBuilder};
use geojson::{FeatureCollection, GeoJson};
use shapefile::{Point, Polygon, PolygonRing, Writer};
use tempfile::TempDir;

const STATCAN_PRJ: &str = r#"PROJCS["NAD83_Statistics_Canada_Lambert",GEOGCS["GCS_North_American_1983",DATUM["D_North_American_1983",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",6200000.0],PARAMETER["False_Northing",3000000.0],PARAMETER["Central_Meridian",-91.86666666666666],PARAMETER["Standard_Parallel_1",49.0],PARAMETER["Standard_Parallel_2",77.0],PARAMETER["Latitude_Of_Origin",63.390675],UNIT["Meter",1.0]]"#;

const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

const INPUT: &str = "lfsa000a21a_e/lfsa000a21a_e.shp";
const OUTPUT: &str = "canada_fsa_boundaries.geojson";

/// FSA en Statistics Canada Lambert: (CFSAUID, PRUID, x, y)
const STATCAN_ROWS: &[(&str, &str, f64, f64)] = &[
    ("A1C", "10", 8980061.656, 2152320.016),
    ("B3H", "12", 8600000.0, 1600000.0),
    ("H2X", "24", 7630000.0, 1240000.0),
    ("K1A", "35", 7471241.789, 1190644.010),
    ("M5V", "35", 7224817.495, 928699.052),
    ("R3C", "46", 5960000.0, 1590000.0),
    ("S4P", "47", 5330000.0, 1750000.0),
    ("T2P", "48", 4650000.0, 1900000.0),
    ("V6B", "59", 4018834.406, 2007337.190),
    ("X0A", "62", 7292762.363, 3241335.326),
    ("Y1A", "60", 4200000.0, 3250000.0),
    ("X1A", "61", 4900000.0, 3050000.0),
];

fn fsa_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_fsa-geojson"))
}

fn run_cli(dir: &Path, args: &[&str]) -> Output {
    let mut cmd = Command::new(fsa_bin());
    cmd.current_dir(dir).args(args);
    for key in [
        "FSA_INPUT",
        "FSA_OUTPUT",
        "FSA_TARGET_CRS",
        "FSA_SOURCE_CRS",
        "FSA_PRECISION",
        "FSA_REPORT",
    ] {
        cmd.env_remove(key);
    }
    cmd.output().expect("failed to execute fsa-geojson")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Carré de 1 km (ou 0.01° en géographique) à partir de (x, y)
fn square(x: f64, y: f64, size: f64) -> Polygon {
    Polygon::new(PolygonRing::Outer(vec![
        Point::new(x, y),
        Point::new(x, y + size),
        Point::new(x + size, y + size),
        Point::new(x + size, y),
        Point::new(x, y),
    ]))
}

/// Écrit `lfsa000a21a_e/lfsa000a21a_e.shp` et ses compagnons dans `root`
fn write_fixture(
    root: &Path,
    rows: &[(&str, &str, f64, f64)],
    prj: Option<&str>,
    with_pruid: bool,
) -> PathBuf {
    let dir = root.join("lfsa000a21a_e");
    fs::create_dir_all(&dir).unwrap();
    let shp = dir.join("lfsa000a21a_e.shp");

    let size = if prj == Some(WGS84_PRJ) { 0.01 } else { 1000.0 };

    let mut builder =
        TableWriterBuilder::new().add_character_field("CFSAUID".try_into().unwrap(), 3);
    if with_pruid {
        builder = builder.add_character_field("PRUID".try_into().unwrap(), 2);
    }

    {
        let mut writer = Writer::from_path(&shp, builder).unwrap();
        for &(code, pruid, x, y) in rows {
            let mut record = Record::default();
            record.insert(
                "CFSAUID".to_string(),
                FieldValue::Character(Some(code.to_string())),
            );
            if with_pruid {
                record.insert(
                    "PRUID".to_string(),
                    FieldValue::Character(Some(pruid.to_string())),
                );
            }
            writer
                .write_shape_and_record(&square(x, y, size), &record)
                .unwrap();
        }
    }

    if let Some(prj) = prj {
        fs::write(dir.join("lfsa000a21a_e.prj"), prj).unwrap();
    }

    shp
}

fn read_collection(path: &Path) -> FeatureCollection {
    let content = fs::read_to_string(path).unwrap();
    match content.parse::<GeoJson>().unwrap() {
        GeoJson::FeatureCollection(fc) => fc,
        other => panic!("expected FeatureCollection, got {:?}", other),
    }
}

/// Toutes les positions (x, y) d'une géométrie polygonale
fn positions(value: &geojson::Value) -> Vec<(f64, f64)> {
    let rings: Vec<&Vec<Vec<f64>>> = match value {
        geojson::Value::Polygon(rings) => rings.iter().collect(),
        geojson::Value::MultiPolygon(polys) => polys.iter().flatten().collect(),
        other => panic!("unexpected geometry {:?}", other),
    };
    rings
        .into_iter()
        .flatten()
        .map(|p| (p[0], p[1]))
        .collect()
}

#[test]
fn test_missing_input_exits_with_1() {
    let dir = TempDir::new().unwrap();

    let output = run_cli(dir.path(), &[]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("Error: {} not found", INPUT)),
        "stdout:\n{}",
        stdout
    );
    assert!(!dir.path().join(OUTPUT).exists());
}

#[test]
fn test_convert_statcan_lambert() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), true);

    let output = run_cli(dir.path(), &[]);
    assert_success(&output);

    let fc = read_collection(&dir.path().join(OUTPUT));
    assert_eq!(fc.features.len(), STATCAN_ROWS.len());

    let members = fc.foreign_members.as_ref().unwrap();
    assert_eq!(members["name"], "canada_fsa_boundaries");
    assert_eq!(
        members["crs"]["properties"]["name"],
        "urn:ogc:def:crs:OGC:1.3:CRS84"
    );

    for (feature, (code, pruid, _, _)) in fc.features.iter().zip(STATCAN_ROWS) {
        assert_eq!(feature.property("CFSAUID").unwrap(), code);
        assert_eq!(feature.property("PRUID").unwrap(), pruid);

        let geometry = feature.geometry.as_ref().unwrap();
        for (lon, lat) in positions(&geometry.value) {
            assert!((-180.0..=180.0).contains(&lon), "lon={}", lon);
            assert!((-90.0..=90.0).contains(&lat), "lat={}", lat);
        }
    }

    // K1A: premier sommet sur la colline du Parlement
    let k1a = positions(&fc.features[3].geometry.as_ref().unwrap().value);
    assert!(k1a
        .iter()
        .any(|(lon, lat)| (lon + 75.6972).abs() < 1e-5 && (lat - 45.4215).abs() < 1e-5));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Loaded 12 FSA boundaries"), "{}", stdout);
    assert!(stdout.contains("Geometry type: Polygon"), "{}", stdout);
    assert!(stdout.contains("Converting to EPSG:4326"), "{}", stdout);
    assert!(stdout.contains("FSAs by Province:"), "{}", stdout);
}

#[test]
fn test_reruns_are_byte_identical() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), true);

    assert_success(&run_cli(dir.path(), &[]));
    let first = fs::read(dir.path().join(OUTPUT)).unwrap();

    assert_success(&run_cli(dir.path(), &[]));
    let second = fs::read(dir.path().join(OUTPUT)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_wgs84_input_is_unchanged() {
    let dir = TempDir::new().unwrap();
    let rows = [("K1A", "35", -75.6972, 45.4215), ("H2X", "24", -73.5673, 45.5017)];
    write_fixture(dir.path(), &rows, Some(WGS84_PRJ), true);

    let output = run_cli(dir.path(), &[]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("Converting to"), "{}", stdout);

    let fc = read_collection(&dir.path().join(OUTPUT));
    for (feature, (_, _, x, y)) in fc.features.iter().zip(rows) {
        let pts = positions(&feature.geometry.as_ref().unwrap().value);
        assert!(pts
            .iter()
            .any(|(lon, lat)| (lon - x).abs() < 1e-9 && (lat - y).abs() < 1e-9));
        for (lon, lat) in pts {
            assert!(lon >= x - 1e-9 && lon <= x + 0.01 + 1e-9);
            assert!(lat >= y - 1e-9 && lat <= y + 0.01 + 1e-9);
        }
    }
}

#[test]
fn test_without_province_column() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), false);

    let output = run_cli(dir.path(), &[]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("FSAs by Province"), "{}", stdout);
    assert!(stdout.contains("Sample FSA codes"), "{}", stdout);
    assert!(dir.path().join(OUTPUT).exists());
}

#[test]
fn test_report_has_ten_sample_codes_in_order() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), true);

    let output = run_cli(dir.path(), &["--report", "report.json"]);
    assert_success(&output);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("report.json")).unwrap())
            .unwrap();

    let expected: Vec<&str> = STATCAN_ROWS.iter().take(10).map(|r| r.0).collect();
    let codes: Vec<&str> = report["sample_codes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(codes, expected);

    assert_eq!(report["features"], 12);
    assert_eq!(report["reprojected"], true);
    assert_eq!(report["by_province"]["35"], 2);
    assert_eq!(report["target_crs"], "EPSG:4326");

    let bytes = fs::read(dir.path().join(OUTPUT)).unwrap();
    assert_eq!(report["output_bytes"], bytes.len() as u64);
    assert_eq!(report["output_blake3"], blake3::hash(&bytes).to_hex().as_str());
}

#[test]
fn test_no_clobber_refuses_existing_output() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), true);
    fs::write(dir.path().join(OUTPUT), "keep me").unwrap();

    let output = run_cli(dir.path(), &["--no-clobber"]);
    assert!(!output.status.success());
    assert_eq!(fs::read_to_string(dir.path().join(OUTPUT)).unwrap(), "keep me");

    // Par défaut le fichier existant est remplacé
    assert_success(&run_cli(dir.path(), &[]));
    assert_eq!(read_collection(&dir.path().join(OUTPUT)).features.len(), 12);
}

#[test]
fn test_missing_prj_requires_source_crs() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, None, true);

    let output = run_cli(dir.path(), &[]);
    assert!(!output.status.success());
    assert!(!dir.path().join(OUTPUT).exists());

    let output = run_cli(dir.path(), &["--source-crs", "EPSG:3347"]);
    assert_success(&output);
    assert_eq!(read_collection(&dir.path().join(OUTPUT)).features.len(), 12);
}

#[test]
fn test_directory_input_and_custom_output() {
    let dir = TempDir::new().unwrap();
    write_fixture(dir.path(), STATCAN_ROWS, Some(STATCAN_PRJ), true);

    let output = run_cli(
        dir.path(),
        &["--input", "lfsa000a21a_e", "--output", "fsa.geojson", "--precision", "5"],
    );
    assert_success(&output);

    let fc = read_collection(&dir.path().join("fsa.geojson"));
    assert_eq!(fc.foreign_members.as_ref().unwrap()["name"], "fsa");
    for feature in &fc.features {
        for (lon, lat) in positions(&feature.geometry.as_ref().unwrap().value) {
            assert!(((lon * 1e5).round() / 1e5 - lon).abs() < 1e-9);
            assert!(((lat * 1e5).round() / 1e5 - lat).abs() < 1e-9);
        }
    }
}
