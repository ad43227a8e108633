use crate::{grid::Crs, TileName};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TileGridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("malformed lookup row {0:?}")]
    MalformedRow(String),

    #[error("invalid tile name {0:?}, expected \"x_y\"")]
    TileName(String),

    #[error("year {0} is outside every known DEM epoch")]
    InvalidYear(u16),

    #[error("unknown DEM epoch {0:?}")]
    InvalidEpoch(String),

    #[error("no lookup entry for tile {tile} in {year}")]
    LookupMiss { year: u16, tile: TileName },

    #[error("{count} lookup entries for tile {tile} in {year}, table is corrupt")]
    LookupAmbiguous {
        year: u16,
        tile: TileName,
        count: usize,
    },

    #[error("AOI is in {aoi} but the grid is in {grid}")]
    GeometryMismatch { aoi: Crs, grid: Crs },

    #[error("unsupported {0} geometry, expected polygons")]
    UnsupportedGeometry(&'static str),

    #[error("AOI polygon {0} has crossing or touching rings")]
    InvalidPolygon(usize),

    #[error("AOI contains no polygons")]
    EmptyAoi,

    #[error("grid feature has no {0:?} attribute")]
    MissingName(String),

    #[error("unrecognized CRS {0:?}")]
    Crs(String),

    #[error("{0}")]
    GeoJson(#[from] geojson::Error),
}
