use criterion::{criterion_group, criterion_main, Criterion};
use tilegrid::{
    geo::geometry::{Coord, LineString, MultiPolygon, Polygon, Rect},
    intersect, reconcile, Aoi, Crs, Epoch, Grid, GridCell, MatchMode, TileName,
};

/// A 1 km grid roughly the size of Thuringia.
fn state_grid() -> Grid {
    let mut cells = Vec::new();
    for y in 5560..5730 {
        for x in 560..750 {
            let min = Coord {
                x: f64::from(x) * 1000.0,
                y: f64::from(y) * 1000.0,
            };
            let max = Coord {
                x: min.x + 1000.0,
                y: min.y + 1000.0,
            };
            cells.push(GridCell {
                name: TileName::new(x, y),
                polygon: MultiPolygon::new(vec![Rect::new(min, max).to_polygon()]),
            });
        }
    }
    Grid {
        epoch: Epoch::Y2014To2019,
        crs: Crs::ETRS89_UTM32N,
        cells,
    }
}

/// A skewed quadrilateral around Erfurt spanning a few dozen cells.
fn erfurt() -> Aoi {
    let ring = LineString::from(vec![
        (638_200.0, 5_646_300.0),
        (647_900.0, 5_645_100.0),
        (649_400.0, 5_653_800.0),
        (640_100.0, 5_655_200.0),
        (638_200.0, 5_646_300.0),
    ]);
    Aoi::new(
        Crs::ETRS89_UTM32N,
        vec![MultiPolygon::new(vec![Polygon::new(ring, vec![])])],
    )
    .unwrap()
}

fn tile_selection(c: &mut Criterion) {
    let grid = state_grid();
    let aoi = erfurt();

    let mut group = c.benchmark_group("Tile Selection");
    group.bench_function("intersects", |b| {
        b.iter(|| intersect(&aoi, &grid, MatchMode::Intersects).unwrap())
    });
    group.bench_function("overlaps", |b| {
        b.iter(|| intersect(&aoi, &grid, MatchMode::Overlaps).unwrap())
    });

    let tiles = intersect(&aoi, &grid, MatchMode::Intersects).unwrap();
    group.bench_function("reconcile", |b| b.iter(|| reconcile(&tiles, 2016)));
    group.finish();
}

criterion_group!(benches, tile_selection);
criterion_main!(benches);
