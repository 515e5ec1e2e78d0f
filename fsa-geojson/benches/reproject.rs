//! Benchmarks pour la reprojection Statistics Canada Lambert → WGS84

use boundary_shp::Crs;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fsa_geojson::reproject_lite::{ReprojectorLite, SmartReprojector};
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};

/// Anneau circulaire de `points` sommets autour d'Ottawa (EPSG:3347)
fn ring(points: usize) -> Geometry {
    let (cx, cy, radius) = (7471241.789, 1190644.010, 5000.0);
    let mut coords: Vec<Coord> = (0..points)
        .map(|i| {
            let angle = i as f64 / points as f64 * std::f64::consts::TAU;
            Coord {
                x: cx + radius * angle.cos(),
                y: cy + radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);

    let polygon = Polygon::new(LineString::new(coords), vec![]);
    Geometry::MultiPolygon(MultiPolygon::new(vec![polygon]))
}

fn bench_transform_point(c: &mut Criterion) {
    let reproj = ReprojectorLite::new(&Crs::from_epsg(3347).unwrap(), &Crs::wgs84()).unwrap();

    c.bench_function("lite_point_3347_4326", |b| {
        b.iter(|| {
            let result = reproj
                .transform_point(black_box(7471241.789), black_box(1190644.010))
                .unwrap();
            black_box(result)
        })
    });
}

fn bench_transform_geometry(c: &mut Criterion) {
    let source = Crs::from_epsg(3347).unwrap();
    let target = Crs::wgs84();
    let smart = SmartReprojector::new(&source, &target).unwrap();

    let mut group = c.benchmark_group("transform_geometry");
    for points in [100usize, 1_000, 10_000] {
        let geometry = ring(points);
        group.throughput(Throughput::Elements(points as u64));
        group.bench_with_input(BenchmarkId::from_parameter(points), &geometry, |b, geom| {
            b.iter(|| {
                let result = smart.transform_geometry(black_box(geom)).unwrap();
                black_box(result)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_transform_point, bench_transform_geometry);
criterion_main!(benches);
