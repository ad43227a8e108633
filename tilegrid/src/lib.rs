//! # Tile Grid
//!
//! `tilegrid` decides which Geoportal Thüringen tiles cover an area of
//! interest and which download ids serve them.
//!
//! DEM archives are addressed by tile name directly. Orthophoto
//! archives are addressed by a numeric id taken from a lookup table,
//! and for acquisitions up to 2018 one id covers a 2x2 block of tiles
//! (see [`reconcile`]).

mod epoch;
mod error;
pub mod grid;
pub mod lookup;
pub mod reconcile;
mod tile;

pub use {
    crate::{
        epoch::{is_block_registered, Epoch, BLOCK_REGISTRATION_LAST_YEAR},
        error::TileGridError,
        grid::{intersect, Aoi, Crs, Grid, GridCell, MatchMode},
        lookup::{LookupEntry, LookupTable, LookupWriter},
        reconcile::{reconcile, resolve_ids},
        tile::{TileName, TileSet},
    },
    geo, geojson,
};
