use clap::{Args, Parser};
use portal::{DemFormat, DEFAULT_BASE_URL, DEFAULT_JOBS, DEFAULT_TARGET_SRS};
use std::path::PathBuf;
use tilegrid::grid::DEFAULT_NAME_FIELD;

/// Download elevation models and orthophotos from Geoportal Thüringen.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub enum Cli {
    /// Download, mosaic and clip the tiles covering an area of
    /// interest.
    Run(Run),

    /// Print the tiles and orthophoto ids covering an area of interest.
    Tiles(Tiles),

    /// Build an orthophoto lookup table by probing download ids.
    Enumerate(Enumerate),

    /// Continue an interrupted enumeration after the last recorded id.
    Resume(Resume),
}

/// Which tiles to select.
#[derive(Debug, Clone, Args)]
pub struct Query {
    /// Directory holding downloads and results.
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// Polygon file (GeoJSON or anything ogr2ogr reads) outlining the
    /// area of interest.
    #[arg(short, long)]
    pub aoi: PathBuf,

    /// Acquisition year.
    #[arg(short, long)]
    pub year: u16,

    /// Orthophoto lookup table [default: <DATA_DIR>/idlist.txt].
    #[arg(short, long)]
    pub lookup: Option<PathBuf>,

    /// Only select cells that partially overlap the AOI, leaving out
    /// cells fully inside or fully containing it.
    #[arg(long)]
    pub overlaps: bool,

    /// Grid attribute holding the tile name.
    #[arg(long, default_value = DEFAULT_NAME_FIELD)]
    pub name_field: String,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Clone, Args)]
pub struct Run {
    #[command(flatten)]
    pub query: Query,

    /// Elevation product: dgm, dom or las.
    #[arg(short, long, default_value_t = DemFormat::Dgm)]
    pub format: DemFormat,

    /// Reference system of the clipped outputs.
    #[arg(long, default_value = DEFAULT_TARGET_SRS)]
    pub srs: String,

    /// Skip orthophotos.
    #[arg(long)]
    pub skip_op: bool,

    /// Skip elevation models.
    #[arg(long)]
    pub skip_dem: bool,
}

#[derive(Debug, Clone, Args)]
pub struct Tiles {
    #[command(flatten)]
    pub query: Query,

    /// Print JSON instead of text.
    #[arg(long)]
    pub json: bool,

    /// Don't resolve orthophoto ids.
    #[arg(long)]
    pub no_ids: bool,
}

#[derive(Debug, Clone, Args)]
pub struct Enumerate {
    /// Lookup table to append to.
    #[arg(short, long)]
    pub out: PathBuf,

    /// First id to probe.
    #[arg(short, long, default_value_t = 0)]
    pub start: u64,

    /// Probe ids below this one.
    #[arg(short, long)]
    pub end: u64,

    /// Concurrent probes.
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

#[derive(Debug, Clone, Args)]
pub struct Resume {
    /// Lookup table of the interrupted run.
    #[arg(short, long)]
    pub out: PathBuf,

    /// Probe ids below this one.
    #[arg(short, long)]
    pub end: u64,

    /// Concurrent probes.
    #[arg(short, long, default_value_t = DEFAULT_JOBS)]
    pub jobs: usize,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}
