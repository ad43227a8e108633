//! # Portal
//!
//! Retrieval of Geoportal Thüringen elevation models and orthophotos
//! for an area of interest.
//!
//! [`Pipeline`] ties the stages together: the epoch's tile grid is
//! downloaded, the tiles meeting the AOI are chosen with [`tilegrid`],
//! their archives are downloaded and extracted below a [`DataDir`],
//! and the rasters are mosaicked and clipped with GDAL. The network
//! and GDAL sit behind the [`Fetch`] and [`Raster`] traits.
//!
//! [`Enumerator`] builds the orthophoto lookup table the pipeline
//! depends on.

mod archive;
mod enumerate;
mod error;
mod fetch;
mod layout;
mod pipeline;
pub mod progress;
mod raster;
mod urls;
mod vector;

pub use crate::{
    archive::{extract, Extracted},
    enumerate::{
        parse_content_disposition, parse_op_filename, Enumerator, Summary, DEFAULT_JOBS,
    },
    error::PortalError,
    fetch::{download_to, Downloaded, Fetch, HttpFetcher},
    layout::{grid_file_name, DataDir, Product},
    pipeline::{
        Pipeline, PipelineBuilder, Report, Selection, DEFAULT_TARGET_SRS, DEM_RESOLUTION_M,
        OP_RESOLUTION_M,
    },
    raster::{Gdal, Raster, NODATA},
    urls::{DemFormat, Endpoints, DEFAULT_BASE_URL},
    vector::{read_aoi, read_features, read_grid},
};
