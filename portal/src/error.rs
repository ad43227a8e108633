use std::{path::PathBuf, process::ExitStatus};
use thiserror::Error;
use tilegrid::{Epoch, TileGridError};

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    TileGrid(#[from] TileGridError),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{0}")]
    GeoJson(#[from] tilegrid::geojson::Error),

    #[error("{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("{program} failed ({status}): {stderr}")]
    Command {
        program: &'static str,
        status: ExitStatus,
        stderr: String,
    },

    #[error("missing required parameter '{0}'")]
    Builder(&'static str),

    #[error("invalid DEM format {0:?}, expected dgm, dom or las")]
    DemFormat(String),

    #[error("no grid file in {0}")]
    NoGrid(PathBuf),

    #[error("AOI selects no {0} grid cells")]
    NoTiles(Epoch),

    #[error("nothing to mosaic for {0}")]
    NoRasters(&'static str),
}
