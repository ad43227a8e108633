//! Orthophoto download-id lookup table.
//!
//! The table is a CSV file with an `id,year,filename` header, where
//! `filename` holds the tile name the id was registered under. It is
//! produced by probing the portal's download endpoint id by id and is
//! only ever appended to.

use crate::{TileGridError, TileName};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs::{File, OpenOptions},
    io::Read,
    path::{Path, PathBuf},
};

/// Column names of a freshly created table.
const HEADER: [&str; 3] = ["id", "year", "filename"];

/// One registered orthophoto archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub id: u64,
    pub year: u16,
    #[serde(rename = "filename", alias = "tilename")]
    pub tilename: TileName,
}

#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    pub fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TileGridError> {
        debug!("reading lookup table {:?}", path.as_ref());
        Self::from_reader(File::open(path)?)
    }

    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, TileGridError> {
        let mut csv_rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(rdr);
        let entries = csv_rdr
            .deserialize()
            .collect::<Result<Vec<LookupEntry>, _>>()?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    /// Returns every acquisition year present, ascending.
    pub fn years(&self) -> Vec<u16> {
        self.entries
            .iter()
            .map(|entry| entry.year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the entries registered for `year`.
    pub fn for_year(&self, year: u16) -> impl Iterator<Item = &LookupEntry> + '_ {
        self.entries.iter().filter(move |entry| entry.year == year)
    }

    /// Returns the download id of `tile` in `year`.
    ///
    /// Exactly one row must match; a missing row means the table is
    /// incomplete, several rows mean it is corrupt.
    pub fn id_for(&self, year: u16, tile: &TileName) -> Result<u64, TileGridError> {
        let mut matches = self.for_year(year).filter(|entry| entry.tilename == *tile);
        let first = matches.next();
        match (first, matches.count()) {
            (None, _) => Err(TileGridError::LookupMiss { year, tile: *tile }),
            (Some(entry), 0) => Ok(entry.id),
            (Some(_), rest) => Err(TileGridError::LookupAmbiguous {
                year,
                tile: *tile,
                count: rest + 1,
            }),
        }
    }
}

/// Append-only writer for a lookup table file.
pub struct LookupWriter {
    path: PathBuf,
    wtr: csv::Writer<File>,
}

impl LookupWriter {
    /// Opens `path` for appending, writing the header if the file is
    /// new or empty.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TileGridError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            wtr.write_record(HEADER)?;
            wtr.flush()?;
        }
        Ok(Self { path, wtr })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entries` and flushes, making them a resume checkpoint.
    pub fn append(&mut self, entries: &[LookupEntry]) -> Result<(), TileGridError> {
        for entry in entries {
            self.wtr.serialize(entry)?;
        }
        self.wtr.flush()?;
        Ok(())
    }
}

/// Returns the id of the last row in the table at `path`.
///
/// `Ok(None)` if the file doesn't exist or holds no rows yet.
pub fn last_recorded_id<P: AsRef<Path>>(path: P) -> Result<Option<u64>, TileGridError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    // Flexible, so a row cut short by an interrupted write still yields
    // its id.
    let mut csv_rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);
    let mut last = None;
    for record in csv_rdr.records() {
        let record = record?;
        let id = record
            .get(0)
            .and_then(|field| field.parse::<u64>().ok())
            .ok_or_else(|| {
                TileGridError::MalformedRow(record.iter().collect::<Vec<_>>().join(","))
            })?;
        last = Some(id);
    }
    Ok(last)
}
