//! End-to-end retrieval for one area of interest and year.

use crate::{
    archive::extract,
    fetch::{download_to, tmp_path, Fetch},
    layout::{DataDir, Product},
    progress,
    raster::{with_extension, Raster},
    urls::{DemFormat, Endpoints},
    vector::{read_aoi, read_grid},
    PortalError,
};
use indicatif::{MultiProgress, ProgressBar};
use log::{debug, info};
use serde::Serialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tilegrid::{
    grid::DEFAULT_NAME_FIELD, intersect, reconcile, resolve_ids, Epoch, LookupTable, MatchMode,
    TileSet,
};

/// Pixel size of the DEM mosaic (meters).
pub const DEM_RESOLUTION_M: f64 = 1.0;

/// Pixel size of the orthophoto mosaic (meters).
pub const OP_RESOLUTION_M: f64 = 0.2;

/// Reference system of the clipped outputs.
pub const DEFAULT_TARGET_SRS: &str = "EPSG:25832";

/// Tiles and download ids covering the AOI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub epoch: Epoch,

    /// Grid cells meeting the AOI; DEM archives are named after these.
    pub tiles: TileSet,

    /// `tiles` as registered for orthophotos in the requested year.
    pub op_tiles: TileSet,

    /// Orthophoto download ids, one per entry of `op_tiles`.
    pub op_ids: Vec<u64>,
}

/// Result of [`Pipeline::run`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub epoch: Epoch,
    pub tiles: TileSet,
    pub op_tiles: TileSet,
    pub op_ids: Vec<u64>,

    /// Clipped DEM, absent for point clouds or when skipped.
    pub dem_clip: Option<PathBuf>,

    /// Clipped orthophoto, absent when skipped.
    pub op_clip: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    data: DataDir,
    aoi: PathBuf,
    year: u16,
    lookup: PathBuf,
    dem_format: DemFormat,
    match_mode: MatchMode,
    grid_name_field: String,
    endpoints: Endpoints,
    target_srs: String,
    skip_op: bool,
    skip_dem: bool,
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder {
            data_dir: None,
            aoi: None,
            year: None,
            lookup: None,
            dem_format: DemFormat::default(),
            match_mode: MatchMode::default(),
            grid_name_field: None,
            base_url: None,
            target_srs: None,
            skip_op: false,
            skip_dem: false,
        }
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data
    }

    pub fn aoi(&self) -> &Path {
        &self.aoi
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn epoch(&self) -> Result<Epoch, PortalError> {
        Ok(Epoch::from_year(self.year)?)
    }

    /// Downloads and extracts the grid of `epoch`, returning the path
    /// of its cell file.
    pub fn fetch_grid(&self, fetch: &dyn Fetch, epoch: Epoch) -> Result<PathBuf, PortalError> {
        let archive = self.data.grid_archive(epoch);
        download_to(fetch, &self.endpoints.grid(epoch), &archive)?;
        extract(&archive, &self.data.grid_dir(epoch))?;
        self.data.locate_grid(epoch)
    }

    /// Decides which tiles and ids to download, fetching nothing but
    /// the grid.
    ///
    /// Every orthophoto id is resolved here, so a tile missing from the
    /// lookup table fails the run before any tile is downloaded.
    pub fn select(&self, fetch: &dyn Fetch) -> Result<Selection, PortalError> {
        let epoch = self.epoch()?;
        let grid_path = self.fetch_grid(fetch, epoch)?;
        let aoi = read_aoi(&self.aoi)?;
        let grid = read_grid(&grid_path, epoch, &self.grid_name_field)?;

        let tiles = intersect(&aoi, &grid, self.match_mode)?;
        if tiles.is_empty() {
            return Err(PortalError::NoTiles(epoch));
        }
        info!("{} tiles of {} meet the AOI", tiles.len(), grid.cells.len());

        let (op_tiles, op_ids) = if self.skip_op {
            (TileSet::new(), Vec::new())
        } else {
            let table = LookupTable::from_path(&self.lookup)?;
            let op_ids = resolve_ids(&tiles, self.year, &table)?;
            (reconcile(&tiles, self.year), op_ids)
        };
        Ok(Selection {
            epoch,
            tiles,
            op_tiles,
            op_ids,
        })
    }

    /// Runs every stage and returns the clipped outputs.
    ///
    /// Any failure aborts the run. Archives and extracted files already
    /// on disk are reused, so a failed run can simply be repeated.
    pub fn run(
        &self,
        fetch: &dyn Fetch,
        raster: &dyn Raster,
        progress_group: &MultiProgress,
    ) -> Result<Report, PortalError> {
        self.data.create()?;
        let Selection {
            epoch,
            tiles,
            op_tiles,
            op_ids,
        } = self.select(fetch)?;

        let dem_files = if self.skip_dem {
            Vec::new()
        } else {
            let pb = progress_group.add(progress::bar(
                format!("Download {} {} tiles", tiles.len(), self.dem_format),
                tiles.len() as u64,
            ));
            self.download_dem(fetch, epoch, &tiles, &pb)?
        };

        let op_files = if self.skip_op {
            Vec::new()
        } else {
            let pb = progress_group.add(progress::bar(
                format!("Download {} orthophotos", op_ids.len()),
                op_ids.len() as u64,
            ));
            self.download_op(fetch, &op_ids, &pb)?
        };

        let dem_clip = if self.skip_dem || !self.dem_format.is_raster() {
            None
        } else {
            let rasters = self.dem_rasters(raster, &dem_files)?;
            Some(self.assemble(raster, Product::Dem, &rasters, DEM_RESOLUTION_M)?)
        };

        let op_clip = if self.skip_op {
            None
        } else {
            let rasters = with_extension(&op_files, "tif");
            Some(self.assemble(raster, Product::Op, &rasters, OP_RESOLUTION_M)?)
        };

        Ok(Report {
            epoch,
            tiles,
            op_tiles,
            op_ids,
            dem_clip,
            op_clip,
        })
    }

    fn download_dem(
        &self,
        fetch: &dyn Fetch,
        epoch: Epoch,
        tiles: &TileSet,
        progress_bar: &ProgressBar,
    ) -> Result<Vec<PathBuf>, PortalError> {
        let mut files = Vec::new();
        for tile in tiles {
            let archive = self.data.dem_archive(tile);
            let url = self.endpoints.dem(self.dem_format, epoch, tile);
            download_to(fetch, &url, &archive)?;
            files.extend(extract(&archive, &self.data.dem_dir())?.files);
            progress_bar.inc(1);
        }
        progress_bar.finish();
        Ok(files)
    }

    fn download_op(
        &self,
        fetch: &dyn Fetch,
        ids: &[u64],
        progress_bar: &ProgressBar,
    ) -> Result<Vec<PathBuf>, PortalError> {
        let mut files = Vec::new();
        for &id in ids {
            let archive = self.data.op_archive(id);
            download_to(fetch, &self.endpoints.op(id), &archive)?;
            files.extend(extract(&archive, &self.data.op_dir())?.files);
            progress_bar.inc(1);
        }
        progress_bar.finish();
        Ok(files)
    }

    /// Converts gridded `.xyz` DEM tiles to GeoTIFF next to their
    /// source. Tiles converted by an earlier run are reused.
    fn dem_rasters(
        &self,
        raster: &dyn Raster,
        files: &[PathBuf],
    ) -> Result<Vec<PathBuf>, PortalError> {
        let mut rasters = with_extension(files, "tif");
        for xyz in with_extension(files, "xyz") {
            let tif = xyz.with_extension("tif");
            if !tif.exists() {
                debug!("converting {xyz:?}");
                let tmp = tmp_path(&tif);
                raster.translate(&xyz, &tmp, &self.target_srs)?;
                fs::rename(tmp, &tif)?;
            }
            if !rasters.contains(&tif) {
                rasters.push(tif);
            }
        }
        Ok(rasters)
    }

    /// Mosaics `rasters` and clips the mosaic to the AOI.
    fn assemble(
        &self,
        raster: &dyn Raster,
        product: Product,
        rasters: &[PathBuf],
        resolution: f64,
    ) -> Result<PathBuf, PortalError> {
        if rasters.is_empty() {
            return Err(PortalError::NoRasters(product.as_str()));
        }
        let mosaic = self.data.mosaic(product);
        raster.mosaic(rasters, &self.data.vrt(product), &mosaic, resolution)?;
        let clipped = self.data.clipped(product);
        raster.clip(&mosaic, &clipped, &self.aoi, &self.target_srs)?;
        info!("{} written to {clipped:?}", product.as_str());
        Ok(clipped)
    }
}

pub struct PipelineBuilder {
    /// Root of all downloaded and derived files (required).
    data_dir: Option<PathBuf>,

    /// Polygon file outlining the area of interest (required).
    aoi: Option<PathBuf>,

    /// Acquisition year (required).
    year: Option<u16>,

    /// Orthophoto lookup table (required).
    lookup: Option<PathBuf>,

    /// Elevation product (defaults to `dgm`).
    dem_format: DemFormat,

    /// Cell selection rule (defaults to `Intersects`).
    match_mode: MatchMode,

    /// Grid attribute holding the tile name (defaults to `NAME`).
    grid_name_field: Option<String>,

    /// Server root (defaults to the public portal).
    base_url: Option<String>,

    /// Reference system of the outputs (defaults to `EPSG:25832`).
    target_srs: Option<String>,

    skip_op: bool,
    skip_dem: bool,
}

impl PipelineBuilder {
    /// Root of all downloaded and derived files (required).
    #[must_use]
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Polygon file outlining the area of interest (required).
    #[must_use]
    pub fn aoi<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.aoi = Some(path.into());
        self
    }

    /// Acquisition year (required).
    #[must_use]
    pub fn year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Orthophoto lookup table (required).
    #[must_use]
    pub fn lookup<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.lookup = Some(path.into());
        self
    }

    #[must_use]
    pub fn dem_format(mut self, format: DemFormat) -> Self {
        self.dem_format = format;
        self
    }

    #[must_use]
    pub fn match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Grid attribute holding the tile name (defaults to `NAME`).
    #[must_use]
    pub fn grid_name_field<S: Into<String>>(mut self, field: S) -> Self {
        self.grid_name_field = Some(field.into());
        self
    }

    #[must_use]
    pub fn base_url<S: Into<String>>(mut self, url: S) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Reference system of the outputs (defaults to `EPSG:25832`).
    #[must_use]
    pub fn target_srs<S: Into<String>>(mut self, srs: S) -> Self {
        self.target_srs = Some(srs.into());
        self
    }

    /// Skip orthophoto download and assembly.
    #[must_use]
    pub fn skip_op(mut self, skip: bool) -> Self {
        self.skip_op = skip;
        self
    }

    /// Skip DEM download and assembly.
    #[must_use]
    pub fn skip_dem(mut self, skip: bool) -> Self {
        self.skip_dem = skip;
        self
    }

    pub fn build(&self) -> Result<Pipeline, PortalError> {
        let data_dir = self
            .data_dir
            .clone()
            .ok_or(PortalError::Builder("data_dir"))?;
        let aoi = self.aoi.clone().ok_or(PortalError::Builder("aoi"))?;
        let year = self.year.ok_or(PortalError::Builder("year"))?;
        let lookup = self.lookup.clone().ok_or(PortalError::Builder("lookup"))?;

        Ok(Pipeline {
            data: DataDir::new(data_dir),
            aoi,
            year,
            lookup,
            dem_format: self.dem_format,
            match_mode: self.match_mode,
            grid_name_field: self
                .grid_name_field
                .clone()
                .unwrap_or_else(|| DEFAULT_NAME_FIELD.to_string()),
            endpoints: self
                .base_url
                .as_deref()
                .map_or_else(Endpoints::default, Endpoints::new),
            target_srs: self
                .target_srs
                .clone()
                .unwrap_or_else(|| DEFAULT_TARGET_SRS.to_string()),
            skip_op: self.skip_op,
            skip_dem: self.skip_dem,
        })
    }
}
