//! Vector file reading.
//!
//! GeoJSON is parsed directly. Any other format, shapefiles in
//! particular, is converted to GeoJSON by `ogr2ogr` first.

use crate::{raster::exec, PortalError};
use log::debug;
use std::{ffi::OsStr, fs::File, io::BufReader, path::Path};
use tilegrid::{
    geojson::{self, FeatureCollection, GeoJson},
    Aoi, Epoch, Grid,
};

pub fn read_features(path: &Path) -> Result<FeatureCollection, PortalError> {
    let geojson = match path.extension().and_then(OsStr::to_str) {
        Some("geojson" | "json") => GeoJson::from_reader(BufReader::new(File::open(path)?))
            .map_err(geojson::Error::from)?,
        _ => {
            debug!("converting {path:?} with ogr2ogr");
            let stdout = exec(
                "ogr2ogr",
                &["-f".into(), "GeoJSON".into(), "/vsistdout/".into(), path.into()],
            )?;
            GeoJson::from_reader(stdout.as_slice()).map_err(geojson::Error::from)?
        }
    };
    Ok(FeatureCollection::try_from(geojson)?)
}

pub fn read_aoi(path: &Path) -> Result<Aoi, PortalError> {
    let aoi = Aoi::from_feature_collection(read_features(path)?)?;
    debug!("AOI {path:?}: {} polygons in {}", aoi.len(), aoi.crs());
    Ok(aoi)
}

pub fn read_grid(path: &Path, epoch: Epoch, name_field: &str) -> Result<Grid, PortalError> {
    Ok(Grid::from_feature_collection(
        read_features(path)?,
        epoch,
        name_field,
    )?)
}

#[cfg(test)]
mod tests {
    use super::{read_aoi, read_grid};
    use crate::PortalError;
    use std::fs;
    use tilegrid::{intersect, Crs, Epoch, MatchMode, TileName};

    #[test]
    fn test_read_geojson() {
        let tmp = tempfile::tempdir().unwrap();
        let aoi_path = tmp.path().join("aoi.geojson");
        fs::write(
            &aoi_path,
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::25832"}},
                "features": [{"type": "Feature", "properties": {"id": 1},
                  "geometry": {"type": "Polygon", "coordinates": [[[632100, 5650100], [632200, 5650100], [632200, 5650200], [632100, 5650200], [632100, 5650100]]]}}]}"#,
        )
        .unwrap();
        let grid_path = tmp.path().join("grid.json");
        fs::write(
            &grid_path,
            r#"{"type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::25832"}},
                "features": [{"type": "Feature", "properties": {"NAME": "632_5650"},
                  "geometry": {"type": "Polygon", "coordinates": [[[632000, 5650000], [633000, 5650000], [633000, 5651000], [632000, 5651000], [632000, 5650000]]]}}]}"#,
        )
        .unwrap();

        let aoi = read_aoi(&aoi_path).unwrap();
        assert_eq!(aoi.crs(), Crs::ETRS89_UTM32N);
        let grid = read_grid(&grid_path, Epoch::Y2020To2025, "NAME").unwrap();
        let tiles = intersect(&aoi, &grid, MatchMode::Intersects).unwrap();
        assert_eq!(tiles.as_slice(), &[TileName::new(632, 5650)]);
    }

    #[test]
    fn test_not_geojson() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("aoi.geojson");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(read_aoi(&path), Err(PortalError::GeoJson(_))));

        let point = tmp.path().join("point.json");
        fs::write(&point, r#"{"type": "Point", "coordinates": [632100, 5650100]}"#).unwrap();
        assert!(matches!(read_aoi(&point), Err(PortalError::GeoJson(_))));
    }
}
