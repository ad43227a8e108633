//! On-disk layout below the data root.
//!
//! ```text
//! <root>/
//!   idlist.txt                 orthophoto lookup table
//!   grid/Stand_<epoch>/        grid archive and its shapefile
//!   dem/                       DEM archives and extracted tiles
//!   op/                        orthophoto archives and extracted tiles
//!   merged/                    mosaics and clipped results
//! ```

use crate::PortalError;
use log::debug;
use std::{
    ffi::OsStr,
    fs,
    path::{Path, PathBuf},
};
use tilegrid::{Epoch, TileName};

/// Which mosaic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    Dem,
    Op,
}

impl Product {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dem => "DEM",
            Self::Op => "OP",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates every stage directory.
    pub fn create(&self) -> Result<(), PortalError> {
        for dir in [self.dem_dir(), self.op_dir(), self.merged_dir()] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn lookup_table(&self) -> PathBuf {
        self.root.join("idlist.txt")
    }

    pub fn grid_dir(&self, epoch: Epoch) -> PathBuf {
        self.root.join("grid").join(format!("Stand_{epoch}"))
    }

    pub fn grid_archive(&self, epoch: Epoch) -> PathBuf {
        self.grid_dir(epoch).join(format!("Stand_{epoch}.zip"))
    }

    pub fn dem_dir(&self) -> PathBuf {
        self.root.join("dem")
    }

    pub fn dem_archive(&self, tile: &TileName) -> PathBuf {
        self.dem_dir().join(format!("{tile}.zip"))
    }

    pub fn op_dir(&self) -> PathBuf {
        self.root.join("op")
    }

    pub fn op_archive(&self, id: u64) -> PathBuf {
        self.op_dir().join(format!("{id}.zip"))
    }

    pub fn merged_dir(&self) -> PathBuf {
        self.root.join("merged")
    }

    pub fn vrt(&self, product: Product) -> PathBuf {
        self.merged_dir().join(format!("merged{}.vrt", product.as_str()))
    }

    pub fn mosaic(&self, product: Product) -> PathBuf {
        self.merged_dir().join(format!("merged{}.tif", product.as_str()))
    }

    pub fn clipped(&self, product: Product) -> PathBuf {
        self.merged_dir()
            .join(format!("merged{}_clip.tif", product.as_str()))
    }

    /// Returns the grid file extracted for `epoch`.
    ///
    /// Prefers the shapefile the portal ships for the epoch, otherwise
    /// the first `.shp` or `.geojson` found in the grid directory.
    pub fn locate_grid(&self, epoch: Epoch) -> Result<PathBuf, PortalError> {
        let dir = self.grid_dir(epoch);
        let known = dir.join(grid_file_name(epoch));
        if known.exists() {
            return Ok(known);
        }
        let mut candidates = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if matches!(
                path.extension().and_then(OsStr::to_str),
                Some("shp" | "geojson" | "json")
            ) {
                candidates.push(path);
            }
        }
        candidates.sort();
        let grid = candidates
            .into_iter()
            .next()
            .ok_or_else(|| PortalError::NoGrid(dir))?;
        debug!("using grid file {grid:?}");
        Ok(grid)
    }
}

/// Name of the cell shapefile inside an epoch's grid archive.
pub const fn grid_file_name(epoch: Epoch) -> &'static str {
    match epoch {
        Epoch::Y2010To2013 => "DGM2_2010-2013_Erfass-lt-Meta_UTM32-UTM_2014-12-10.shp",
        Epoch::Y2014To2019 => "DGM1_2014-2019_Erfass-lt-Meta_UTM_2020-04-20--17127.shp",
        Epoch::Y2020To2025 => "DGM1_2020-2025_Erfass-lt-Meta_UTM_2021-03--17127.shp",
    }
}
