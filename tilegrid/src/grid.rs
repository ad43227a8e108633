//! DEM tile grids and their intersection with an area of interest.

use crate::{Epoch, TileGridError, TileName, TileSet};
use geo::{
    geometry::{Geometry, Line, MultiPolygon, Polygon, Rect},
    Area, BooleanOps, BoundingRect, Intersects,
};
use geojson::FeatureCollection;
use log::{debug, warn};
use serde::Serialize;
use std::{fmt, str::FromStr};

/// Default attribute holding a grid cell's tile name.
pub const DEFAULT_NAME_FIELD: &str = "NAME";

/// Coordinate reference system, as an EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Crs(pub u32);

impl Crs {
    /// Implied by GeoJSON without a `crs` member.
    pub const WGS84: Crs = Crs(4326);

    /// ETRS89 / UTM zone 32N, used by every Thuringian grid.
    pub const ETRS89_UTM32N: Crs = Crs(25832);

    /// Returns the CRS declared by `fc`'s legacy `crs` member.
    pub fn from_feature_collection(fc: &FeatureCollection) -> Result<Self, TileGridError> {
        let Some(crs) = fc.foreign_members.as_ref().and_then(|m| m.get("crs")) else {
            return Ok(Self::WGS84);
        };
        crs.get("properties")
            .and_then(|props| props.get("name"))
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| TileGridError::Crs(crs.to_string()))?
            .parse()
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl FromStr for Crs {
    type Err = TileGridError;

    /// Accepts `EPSG:25832`, `urn:ogc:def:crs:EPSG::25832`, a bare
    /// code, and the OGC `CRS84` urn.
    fn from_str(s: &str) -> Result<Self, TileGridError> {
        let s = s.trim();
        if s.ends_with("CRS84") {
            return Ok(Self::WGS84);
        }
        s.rsplit(':')
            .next()
            .and_then(|code| code.parse::<u32>().ok())
            .filter(|_| !s.contains(':') || s.to_ascii_uppercase().contains("EPSG"))
            .map(Crs)
            .ok_or_else(|| TileGridError::Crs(s.to_string()))
    }
}

/// A polygon with its precomputed extent and area.
#[derive(Debug, Clone)]
struct Shape {
    polygon: MultiPolygon<f64>,
    bbox: Rect<f64>,
    area: f64,
}

impl Shape {
    fn new(polygon: MultiPolygon<f64>) -> Option<Self> {
        let bbox = polygon.bounding_rect()?;
        let area = polygon.unsigned_area();
        Some(Self {
            polygon,
            bbox,
            area,
        })
    }
}

/// Area of interest.
#[derive(Debug, Clone)]
pub struct Aoi {
    crs: Crs,
    parts: Vec<Shape>,
}

impl Aoi {
    /// Fails if any part has rings that cross or touch, which the
    /// area computation can't handle.
    pub fn new(crs: Crs, parts: Vec<MultiPolygon<f64>>) -> Result<Self, TileGridError> {
        if let Some(idx) = parts.iter().position(|part| !is_simple(part)) {
            return Err(TileGridError::InvalidPolygon(idx));
        }
        let parts: Vec<Shape> = parts.into_iter().filter_map(Shape::new).collect();
        if parts.is_empty() {
            return Err(TileGridError::EmptyAoi);
        }
        Ok(Self { crs, parts })
    }

    /// Builds an AOI from every polygonal feature of `fc`.
    pub fn from_feature_collection(fc: FeatureCollection) -> Result<Self, TileGridError> {
        let crs = Crs::from_feature_collection(&fc)?;
        let parts = fc
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .map(to_multi_polygon)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(crs, parts)
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Number of polygonal features.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GridCell {
    pub name: TileName,
    pub polygon: MultiPolygon<f64>,
}

/// The named cells of one DEM epoch.
#[derive(Debug, Clone)]
pub struct Grid {
    pub epoch: Epoch,
    pub crs: Crs,
    pub cells: Vec<GridCell>,
}

impl Grid {
    /// Builds a grid from `fc`, naming each cell by its `name_field`
    /// attribute.
    ///
    /// Features without geometry are skipped.
    pub fn from_feature_collection(
        fc: FeatureCollection,
        epoch: Epoch,
        name_field: &str,
    ) -> Result<Self, TileGridError> {
        let crs = Crs::from_feature_collection(&fc)?;
        let mut cells = Vec::with_capacity(fc.features.len());
        for feature in fc.features {
            let name = match feature.property(name_field) {
                Some(serde_json::Value::String(name)) => name.parse()?,
                Some(other) => other.to_string().parse()?,
                None => return Err(TileGridError::MissingName(name_field.to_string())),
            };
            match feature.geometry {
                Some(geometry) => cells.push(GridCell {
                    name,
                    polygon: to_multi_polygon(geometry)?,
                }),
                None => debug!("grid cell {name} has no geometry"),
            }
        }
        debug!("{epoch} grid has {} cells in {crs}", cells.len());
        Ok(Self { epoch, crs, cells })
    }
}

/// How a grid cell must relate to the AOI to be selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Cell and AOI share some area.
    #[default]
    Intersects,

    /// Cell and AOI share some area but neither covers the other.
    ///
    /// This reproduces the legacy selection rule, which drops a cell
    /// lying entirely inside the AOI as well as the single cell of an
    /// AOI drawn entirely inside it.
    Overlaps,
}

impl MatchMode {
    fn accepts(self, shared: f64, cell_area: f64, aoi_area: f64) -> bool {
        let eps = f64::EPSILON.sqrt() * cell_area.min(aoi_area);
        match self {
            Self::Intersects => shared > eps,
            Self::Overlaps => shared > eps && shared < cell_area - eps && shared < aoi_area - eps,
        }
    }
}

/// Returns the names of the cells of `grid` selected by `aoi` under
/// `mode`, in grid order.
pub fn intersect(aoi: &Aoi, grid: &Grid, mode: MatchMode) -> Result<TileSet, TileGridError> {
    if aoi.crs != grid.crs {
        return Err(TileGridError::GeometryMismatch {
            aoi: aoi.crs,
            grid: grid.crs,
        });
    }

    let mut tiles = TileSet::new();
    for GridCell { name, polygon } in &grid.cells {
        let Some(bbox) = polygon.bounding_rect() else {
            continue;
        };
        let area = polygon.unsigned_area();
        let selected = aoi.parts.iter().any(|part| {
            part.bbox.intersects(&bbox) && {
                let shared = polygon.intersection(&part.polygon).unsigned_area();
                mode.accepts(shared, area, part.area)
            }
        });
        if selected && !tiles.insert(*name) {
            warn!("grid lists cell {name} more than once");
        }
    }
    debug!("{} of {} {} cells selected", tiles.len(), grid.cells.len(), grid.epoch);
    Ok(tiles)
}

/// Returns `false` if two edges of `polygon` meet anywhere other than
/// the vertex joining consecutive edges of one ring.
fn is_simple(polygon: &MultiPolygon<f64>) -> bool {
    let rings: Vec<Vec<Line<f64>>> = polygon
        .iter()
        .flat_map(|part| std::iter::once(part.exterior()).chain(part.interiors()))
        .map(|ring| ring.lines().filter(|line| line.start != line.end).collect())
        .collect();
    for (idx, ring) in rings.iter().enumerate() {
        let last = ring.len().saturating_sub(1);
        for (a, edge) in ring.iter().enumerate() {
            let crosses_own_ring = ring
                .iter()
                .enumerate()
                .skip(a + 2)
                .filter(|&(b, _)| !(a == 0 && b == last))
                .any(|(_, other)| edge.intersects(other));
            let crosses_later_ring = rings[idx + 1..]
                .iter()
                .flatten()
                .any(|other| edge.intersects(other));
            if crosses_own_ring || crosses_later_ring {
                return false;
            }
        }
    }
    true
}

fn to_multi_polygon(geometry: geojson::Geometry) -> Result<MultiPolygon<f64>, TileGridError> {
    match Geometry::<f64>::try_from(geometry)? {
        Geometry::Polygon(polygon) => Ok(MultiPolygon::new(vec![polygon])),
        Geometry::MultiPolygon(multi) => Ok(multi),
        Geometry::Rect(rect) => Ok(MultiPolygon::new(vec![rect.to_polygon()])),
        Geometry::GeometryCollection(collection) => {
            let mut polygons: Vec<Polygon<f64>> = Vec::new();
            for geometry in collection {
                match geometry {
                    Geometry::Polygon(polygon) => polygons.push(polygon),
                    Geometry::MultiPolygon(multi) => polygons.extend(multi),
                    other => return Err(TileGridError::UnsupportedGeometry(kind(&other))),
                }
            }
            Ok(MultiPolygon::new(polygons))
        }
        other => Err(TileGridError::UnsupportedGeometry(kind(&other))),
    }
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "point",
        Geometry::Line(_) => "line",
        Geometry::LineString(_) => "linestring",
        Geometry::Polygon(_) => "polygon",
        Geometry::MultiPoint(_) => "multipoint",
        Geometry::MultiLineString(_) => "multilinestring",
        Geometry::MultiPolygon(_) => "multipolygon",
        Geometry::GeometryCollection(_) => "geometrycollection",
        Geometry::Rect(_) => "rect",
        Geometry::Triangle(_) => "triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::{intersect, Aoi, Crs, Grid, GridCell, MatchMode};
    use crate::{Epoch, TileGridError, TileName};
    use geo::geometry::{LineString, MultiPolygon, Polygon, Rect};
    use geojson::{FeatureCollection, GeoJson};

    /// 1 km cells named by their kilometre coordinates.
    fn km_grid(xs: std::ops::Range<u32>, ys: std::ops::Range<u32>) -> Grid {
        let mut cells = Vec::new();
        for y in ys {
            for x in xs.clone() {
                cells.push(GridCell {
                    name: TileName::new(x, y),
                    polygon: square(f64::from(x) * 1000.0, f64::from(y) * 1000.0, 1000.0),
                });
            }
        }
        Grid {
            epoch: Epoch::Y2014To2019,
            crs: Crs::ETRS89_UTM32N,
            cells,
        }
    }

    fn square(x: f64, y: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Rect::new((x, y), (x + size, y + size)).to_polygon()])
    }

    fn aoi(parts: Vec<MultiPolygon<f64>>) -> Aoi {
        Aoi::new(Crs::ETRS89_UTM32N, parts).unwrap()
    }

    fn names(tiles: &crate::TileSet) -> Vec<String> {
        tiles.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_block_of_four() {
        let grid = km_grid(98..104, 198..204);
        let aoi = aoi(vec![square(100_250.0, 200_250.0, 1500.0)]);
        for mode in [MatchMode::Intersects, MatchMode::Overlaps] {
            let tiles = intersect(&aoi, &grid, mode).unwrap();
            assert_eq!(
                names(&tiles),
                ["100_200", "101_200", "100_201", "101_201"],
                "{mode:?}"
            );
        }
    }

    #[test]
    fn test_edge_contact_is_not_shared_area() {
        let grid = km_grid(98..104, 198..204);
        // Exactly covers four cells, touching eight neighbours.
        let aoi = aoi(vec![square(100_000.0, 200_000.0, 2000.0)]);
        let tiles = intersect(&aoi, &grid, MatchMode::Intersects).unwrap();
        assert_eq!(names(&tiles), ["100_200", "101_200", "100_201", "101_201"]);
    }

    #[test]
    fn test_overlaps_misses_contained_cells() {
        let grid = km_grid(98..104, 198..204);
        // 3x3 km around cell 101_201 which lies entirely inside.
        let aoi = aoi(vec![square(100_500.0, 200_500.0, 3000.0)]);

        let intersects = intersect(&aoi, &grid, MatchMode::Intersects).unwrap();
        assert_eq!(intersects.len(), 16);
        assert!(intersects.contains(&TileName::new(101, 201)));

        let overlaps = intersect(&aoi, &grid, MatchMode::Overlaps).unwrap();
        assert_eq!(overlaps.len(), 12);
        assert!(!overlaps.contains(&TileName::new(101, 201)));
        assert!(!overlaps.contains(&TileName::new(102, 202)));
    }

    #[test]
    fn test_overlaps_misses_containing_cell() {
        let grid = km_grid(98..104, 198..204);
        let aoi = aoi(vec![square(100_100.0, 200_100.0, 200.0)]);
        assert_eq!(
            names(&intersect(&aoi, &grid, MatchMode::Intersects).unwrap()),
            ["100_200"]
        );
        assert!(intersect(&aoi, &grid, MatchMode::Overlaps)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_multipart_aoi_dedups() {
        let grid = km_grid(98..104, 198..204);
        let aoi = aoi(vec![
            square(100_100.0, 200_100.0, 200.0),
            square(100_600.0, 200_600.0, 200.0),
            square(103_100.0, 203_100.0, 200.0),
        ]);
        assert_eq!(
            names(&intersect(&aoi, &grid, MatchMode::Intersects).unwrap()),
            ["100_200", "103_203"]
        );
    }

    #[test]
    fn test_rejects_self_intersecting_aoi() {
        let ring = |coords: &[(f64, f64)]| {
            MultiPolygon::new(vec![Polygon::new(LineString::from(coords.to_vec()), vec![])])
        };
        let bowtie = ring(&[(0.0, 0.0), (2.0, 2.0), (2.0, 0.0), (0.0, 2.0)]);
        assert!(matches!(
            Aoi::new(Crs::ETRS89_UTM32N, vec![square(0.0, 0.0, 1.0), bowtie]),
            Err(TileGridError::InvalidPolygon(1))
        ));

        // Revisits (4000, 4500) without crossing any edge.
        let pinched = ring(&[
            (9116.12, 4465.0),
            (4217.12, 3375.0),
            (4114.12, 7625.0),
            (9000.0, 8000.0),
            (8044.12, 6757.0),
            (5125.12, 4164.0),
            (4000.0, 4500.0),
            (7406.12, 601.0),
            (4000.0, 4500.0),
        ]);
        assert!(matches!(
            Aoi::new(Crs::ETRS89_UTM32N, vec![pinched]),
            Err(TileGridError::InvalidPolygon(0))
        ));

        let hole_crossing = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)]),
            vec![LineString::from(vec![(1.0, 1.0), (5.0, 1.0), (5.0, 2.0), (1.0, 2.0)])],
        )]);
        assert!(Aoi::new(Crs::ETRS89_UTM32N, vec![hole_crossing]).is_err());
    }

    #[test]
    fn test_accepts_repeated_consecutive_vertex() {
        let grid = km_grid(98..104, 198..204);
        let polygon = Polygon::new(
            LineString::from(vec![
                (100_100.0, 200_100.0),
                (100_300.0, 200_100.0),
                (100_300.0, 200_100.0),
                (100_300.0, 200_300.0),
                (100_100.0, 200_300.0),
            ]),
            vec![LineString::from(vec![
                (100_150.0, 200_150.0),
                (100_250.0, 200_150.0),
                (100_250.0, 200_250.0),
                (100_150.0, 200_250.0),
            ])],
        );
        let aoi = aoi(vec![MultiPolygon::new(vec![polygon])]);
        assert_eq!(
            names(&intersect(&aoi, &grid, MatchMode::Intersects).unwrap()),
            ["100_200"]
        );
    }

    #[test]
    fn test_crs_mismatch() {
        let grid = km_grid(98..104, 198..204);
        let aoi = Aoi::new(Crs::WGS84, vec![square(10.0, 50.0, 0.1)]).unwrap();
        assert!(matches!(
            intersect(&aoi, &grid, MatchMode::Intersects),
            Err(TileGridError::GeometryMismatch {
                aoi: Crs::WGS84,
                grid: Crs::ETRS89_UTM32N
            })
        ));
    }

    #[test]
    fn test_parse_crs() {
        assert_eq!("EPSG:25832".parse::<Crs>().unwrap(), Crs(25832));
        assert_eq!("urn:ogc:def:crs:EPSG::25832".parse::<Crs>().unwrap(), Crs(25832));
        assert_eq!("urn:ogc:def:crs:OGC:1.3:CRS84".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!("25832".parse::<Crs>().unwrap(), Crs(25832));
        assert!("ESRI:102100".parse::<Crs>().is_err());
        assert_eq!(Crs(25832).to_string(), "EPSG:25832");
    }

    const GRID_JSON: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::25832" } },
        "features": [
            { "type": "Feature", "properties": { "NAME": "632_5650" },
              "geometry": { "type": "Polygon", "coordinates": [[[632000, 5650000], [633000, 5650000], [633000, 5651000], [632000, 5651000], [632000, 5650000]]] } },
            { "type": "Feature", "properties": { "NAME": "633_5650" },
              "geometry": { "type": "Polygon", "coordinates": [[[633000, 5650000], [634000, 5650000], [634000, 5651000], [633000, 5651000], [633000, 5650000]]] } }
        ]
    }"#;

    const AOI_JSON: &str = r#"{
        "type": "FeatureCollection",
        "crs": { "type": "name", "properties": { "name": "EPSG:25832" } },
        "features": [
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon", "coordinates": [[[632900, 5650100], [633100, 5650100], [633100, 5650200], [632900, 5650200], [632900, 5650100]]] } }
        ]
    }"#;

    fn collection(json: &str) -> FeatureCollection {
        FeatureCollection::try_from(json.parse::<GeoJson>().unwrap()).unwrap()
    }

    #[test]
    fn test_from_geojson() {
        let grid =
            Grid::from_feature_collection(collection(GRID_JSON), Epoch::Y2014To2019, "NAME")
                .unwrap();
        assert_eq!(grid.crs, Crs::ETRS89_UTM32N);
        assert_eq!(grid.cells.len(), 2);

        let aoi = Aoi::from_feature_collection(collection(AOI_JSON)).unwrap();
        assert_eq!(aoi.crs(), Crs::ETRS89_UTM32N);
        assert_eq!(
            names(&intersect(&aoi, &grid, MatchMode::default()).unwrap()),
            ["632_5650", "633_5650"]
        );
    }

    #[test]
    fn test_missing_name_field() {
        assert!(matches!(
            Grid::from_feature_collection(collection(GRID_JSON), Epoch::Y2014To2019, "DGM_1X1"),
            Err(TileGridError::MissingName(_))
        ));
    }

    #[test]
    fn test_aoi_rejects_points() {
        let json = r#"{"type": "FeatureCollection", "features": [
            { "type": "Feature", "properties": {}, "geometry": { "type": "Point", "coordinates": [11.0, 50.9] } }
        ]}"#;
        assert!(matches!(
            Aoi::from_feature_collection(collection(json)),
            Err(TileGridError::UnsupportedGeometry("point"))
        ));
        let empty = r#"{"type": "FeatureCollection", "features": []}"#;
        assert!(matches!(
            Aoi::from_feature_collection(collection(empty)),
            Err(TileGridError::EmptyAoi)
        ));
    }
}
