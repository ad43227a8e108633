//! Mapping of intersected tiles onto orthophoto download ids.
//!
//! Orthophotos acquired up to and including 2018 are registered in
//! 2x2 blocks: only the block's lower-left cell (even `x` and even
//! `y`) has a lookup entry and its archive covers all four cells.
//! Later years register every cell individually.

use crate::{epoch::is_block_registered, LookupTable, TileGridError, TileSet};
use log::debug;

/// Returns the tile names to look up for `year`.
///
/// For block registered years every name with an odd coordinate is
/// replaced by its block's lower-left cell and the result is
/// de-duplicated. Block origins already in `tiles` keep their input
/// order; replacements follow in the order they were encountered.
/// Later years return `tiles` unchanged.
pub fn reconcile(tiles: &TileSet, year: u16) -> TileSet {
    if !is_block_registered(year) {
        return tiles.clone();
    }

    let (origins, members): (Vec<_>, Vec<_>) =
        tiles.iter().copied().partition(|tile| tile.is_block_origin());

    let mut reconciled: TileSet = origins.into_iter().collect();
    for tile in members {
        let origin = tile.block_origin();
        if reconciled.insert(origin) {
            debug!("{tile} is registered under {origin}");
        }
    }
    reconciled
}

/// Returns the download ids of `tiles` for `year`, in reconciled
/// order.
///
/// Fails on the first tile without exactly one lookup entry; no
/// partial list is returned.
pub fn resolve_ids(
    tiles: &TileSet,
    year: u16,
    table: &LookupTable,
) -> Result<Vec<u64>, TileGridError> {
    reconcile(tiles, year)
        .iter()
        .map(|tile| table.id_for(year, tile))
        .collect()
}
