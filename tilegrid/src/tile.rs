//! Tile coordinate names and ordered tile sets.

use crate::TileGridError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// A grid cell identified by its `x_y` name.
///
/// The portal names cells by the kilometre easting and northing of
/// their lower-left corner, e.g. `632_5650`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TileName {
    pub x: u32,
    pub y: u32,
}

impl TileName {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns `true` if both coordinates are even.
    ///
    /// Only these cells carry their own lookup entry for block
    /// registered years.
    pub const fn is_block_origin(&self) -> bool {
        self.x & 1 == 0 && self.y & 1 == 0
    }

    /// Returns the lower-left cell of the 2x2 block containing `self`.
    #[must_use]
    pub const fn block_origin(&self) -> Self {
        Self {
            x: self.x & !1,
            y: self.y & !1,
        }
    }
}

impl fmt::Display for TileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

impl FromStr for TileName {
    type Err = TileGridError;

    fn from_str(s: &str) -> Result<Self, TileGridError> {
        let invalid = || TileGridError::TileName(s.to_string());
        let (x, y) = s.trim().split_once('_').ok_or_else(invalid)?;
        let x = x.parse::<u32>().map_err(|_| invalid())?;
        let y = y.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { x, y })
    }
}

impl TryFrom<String> for TileName {
    type Error = TileGridError;

    fn try_from(s: String) -> Result<Self, TileGridError> {
        s.parse()
    }
}

impl From<TileName> for String {
    fn from(tile: TileName) -> String {
        tile.to_string()
    }
}

/// Insertion ordered collection of unique tile names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TileSet {
    tiles: Vec<TileName>,
}

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `tile` unless already present.
    ///
    /// Returns `true` if `tile` was added.
    pub fn insert(&mut self, tile: TileName) -> bool {
        if self.contains(&tile) {
            false
        } else {
            self.tiles.push(tile);
            true
        }
    }

    pub fn contains(&self, tile: &TileName) -> bool {
        self.tiles.contains(tile)
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TileName> {
        self.tiles.iter()
    }

    pub fn as_slice(&self) -> &[TileName] {
        &self.tiles
    }
}

impl FromIterator<TileName> for TileSet {
    fn from_iter<I: IntoIterator<Item = TileName>>(iter: I) -> Self {
        let mut set = Self::new();
        for tile in iter {
            set.insert(tile);
        }
        set
    }
}

impl IntoIterator for TileSet {
    type Item = TileName;
    type IntoIter = std::vec::IntoIter<TileName>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.into_iter()
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = &'a TileName;
    type IntoIter = std::slice::Iter<'a, TileName>;

    fn into_iter(self) -> Self::IntoIter {
        self.tiles.iter()
    }
}
