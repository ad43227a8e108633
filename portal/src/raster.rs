//! Raster conversion, mosaicking and clipping.
//!
//! The work is done by the GDAL command line utilities, which must be
//! on `PATH`.

use crate::PortalError;
use log::{debug, info};
use std::{
    ffi::{OsStr, OsString},
    fs,
    path::{Path, PathBuf},
    process::Command,
};

/// Value written where the clipped raster lies outside the AOI.
pub const NODATA: &str = "0";

pub trait Raster {
    /// Converts `input` to a GeoTIFF at `output`, assigning `srs`.
    ///
    /// `output` need not carry a `.tif` extension.
    fn translate(&self, input: &Path, output: &Path, srs: &str) -> Result<(), PortalError>;

    /// Mosaics `inputs` through a virtual raster at `vrt` into a
    /// GeoTIFF at `output` with square pixels of `resolution` units.
    fn mosaic(
        &self,
        inputs: &[PathBuf],
        vrt: &Path,
        output: &Path,
        resolution: f64,
    ) -> Result<(), PortalError>;

    /// Clips `input` to the polygons in `cutline`, reprojecting to
    /// `srs`.
    fn clip(&self, input: &Path, output: &Path, cutline: &Path, srs: &str)
        -> Result<(), PortalError>;
}

/// [`Raster`] backed by the GDAL command line utilities.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gdal;

impl Raster for Gdal {
    fn translate(&self, input: &Path, output: &Path, srs: &str) -> Result<(), PortalError> {
        exec("gdal_translate", &translate_args(input, output, srs))?;
        Ok(())
    }

    fn mosaic(
        &self,
        inputs: &[PathBuf],
        vrt: &Path,
        output: &Path,
        resolution: f64,
    ) -> Result<(), PortalError> {
        if let Some(parent) = vrt.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("building {vrt:?} from {} rasters", inputs.len());
        exec("gdalbuildvrt", &buildvrt_args(inputs, vrt))?;
        exec("gdal_translate", &resample_args(vrt, output, resolution))?;
        Ok(())
    }

    fn clip(
        &self,
        input: &Path,
        output: &Path,
        cutline: &Path,
        srs: &str,
    ) -> Result<(), PortalError> {
        exec("gdalwarp", &clip_args(input, output, cutline, srs))?;
        Ok(())
    }
}

fn translate_args(input: &Path, output: &Path, srs: &str) -> Vec<OsString> {
    vec![
        "-of".into(),
        "GTiff".into(),
        "-a_srs".into(),
        srs.into(),
        input.into(),
        output.into(),
    ]
}

fn buildvrt_args(inputs: &[PathBuf], vrt: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-overwrite".into(), vrt.into()];
    args.extend(inputs.iter().map(OsString::from));
    args
}

fn resample_args(vrt: &Path, output: &Path, resolution: f64) -> Vec<OsString> {
    let resolution = resolution.to_string();
    vec![
        "-tr".into(),
        resolution.clone().into(),
        resolution.into(),
        vrt.into(),
        output.into(),
    ]
}

fn clip_args(input: &Path, output: &Path, cutline: &Path, srs: &str) -> Vec<OsString> {
    vec![
        "-overwrite".into(),
        "-cutline".into(),
        cutline.into(),
        "-crop_to_cutline".into(),
        "-dstnodata".into(),
        NODATA.into(),
        "-t_srs".into(),
        srs.into(),
        input.into(),
        output.into(),
    ]
}

/// Runs `program` and returns its standard output.
pub(crate) fn exec(program: &'static str, args: &[OsString]) -> Result<Vec<u8>, PortalError> {
    debug!(
        "{program} {}",
        args.iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );
    let output = Command::new(program).args(args).output()?;
    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(PortalError::Command {
            program,
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Returns the files in `paths` with extension `ext`.
pub(crate) fn with_extension<'a>(
    paths: impl IntoIterator<Item = &'a PathBuf>,
    ext: &str,
) -> Vec<PathBuf> {
    paths
        .into_iter()
        .filter(|path| {
            path.extension()
                .and_then(OsStr::to_str)
                .is_some_and(|e| e.eq_ignore_ascii_case(ext))
        })
        .cloned()
        .collect()
}
