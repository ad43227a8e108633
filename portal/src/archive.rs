//! ZIP extraction.

use crate::{fetch::tmp_path, PortalError};
use log::{debug, warn};
use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};
use zip::ZipArchive;

/// Files of one extracted archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    /// Every file the archive holds, below the destination directory.
    pub files: Vec<PathBuf>,

    /// How many of `files` were written by this extraction.
    pub written: usize,
}

/// Extracts `archive` into `dest`.
///
/// Files that already exist are left untouched, so repeating an
/// extraction is cheap and never clobbers earlier results. Entries
/// whose names would escape `dest` are skipped.
pub fn extract(archive: &Path, dest: &Path) -> Result<Extracted, PortalError> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(archive)?))?;
    fs::create_dir_all(dest)?;

    let mut extracted = Extracted::default();
    for idx in 0..zip.len() {
        let mut entry = zip.by_index(idx)?;
        let Some(path) = entry.enclosed_name().map(|name| dest.join(name)) else {
            warn!("{archive:?}: skipping unsafe entry {:?}", entry.name());
            continue;
        };
        if entry.is_dir() {
            fs::create_dir_all(&path)?;
            continue;
        }
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let tmp = tmp_path(&path);
            io::copy(&mut entry, &mut File::create(&tmp)?)?;
            fs::rename(tmp, &path)?;
            extracted.written += 1;
        }
        extracted.files.push(path);
    }
    debug!(
        "{archive:?}: {} files, {} new",
        extracted.files.len(),
        extracted.written
    );
    Ok(extracted)
}
