//! Lookup table construction.
//!
//! The portal offers no listing of orthophoto archives. Each download
//! id is probed with a HEAD request instead, and the file name the
//! server would deliver tells which tile and year the id belongs to.
//! Probes run in batches on a dedicated thread pool. Every batch is
//! appended to the table before the next one starts, so an interrupted
//! run can be picked up with [`Enumerator::resume`].

use crate::{fetch::Fetch, urls::Endpoints, PortalError};
use indicatif::ProgressBar;
use log::{debug, info, warn};
use rayon::{prelude::*, ThreadPoolBuilder};
use std::path::Path;
use tilegrid::{
    lookup::{last_recorded_id, LookupEntry, LookupWriter},
    TileName,
};

/// Default number of concurrent probes.
pub const DEFAULT_JOBS: usize = 200;

/// Outcome of an enumeration run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Ids probed.
    pub probed: u64,

    /// Entries appended to the table.
    pub found: usize,

    /// First id not probed.
    pub next: u64,
}

pub struct Enumerator<'a> {
    fetch: &'a dyn Fetch,
    endpoints: &'a Endpoints,
    jobs: usize,
}

impl<'a> Enumerator<'a> {
    pub fn new(fetch: &'a dyn Fetch, endpoints: &'a Endpoints, jobs: usize) -> Self {
        Self {
            fetch,
            endpoints,
            jobs: jobs.max(1),
        }
    }

    /// Probes ids `start..end` and appends every orthophoto found to the
    /// table at `table`.
    ///
    /// A probe that fails for any reason other than the id being
    /// unknown stops the run. Entries found below the failing id are
    /// written first.
    pub fn run(
        &self,
        start: u64,
        end: u64,
        table: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<Summary, PortalError> {
        let pool = ThreadPoolBuilder::new().num_threads(self.jobs).build()?;
        let mut writer = LookupWriter::open(table)?;
        progress_bar.set_length(end.saturating_sub(start));

        let mut summary = Summary {
            probed: 0,
            found: 0,
            next: start,
        };
        while summary.next < end {
            let batch_end = end.min(summary.next.saturating_add(self.jobs as u64));
            let ids: Vec<u64> = (summary.next..batch_end).collect();
            let results: Vec<Result<Option<LookupEntry>, PortalError>> =
                pool.install(|| ids.par_iter().map(|&id| self.probe(id)).collect());

            let mut found = Vec::new();
            let mut failure = None;
            for (&id, result) in ids.iter().zip(results) {
                match result {
                    Ok(Some(entry)) => found.push(entry),
                    Ok(None) => (),
                    Err(e) => {
                        failure = Some((id, e));
                        break;
                    }
                }
            }
            writer.append(&found)?;
            summary.found += found.len();

            if let Some((id, e)) = failure {
                warn!("probe of id {id} failed, stopping: {e}");
                progress_bar.inc(id - summary.next);
                return Err(e);
            }
            summary.probed += batch_end - summary.next;
            progress_bar.inc(batch_end - summary.next);
            debug!("ids {}..{batch_end}: {} found", summary.next, found.len());
            summary.next = batch_end;
        }
        info!(
            "probed {} ids, appended {} entries to {:?}",
            summary.probed,
            summary.found,
            writer.path()
        );
        Ok(summary)
    }

    /// Continues a run from the id after the last one in `table`.
    ///
    /// Returns `None` if the table already reaches `end`.
    pub fn resume(
        &self,
        end: u64,
        table: &Path,
        progress_bar: &ProgressBar,
    ) -> Result<Option<Summary>, PortalError> {
        let start = last_recorded_id(table)?.map_or(0, |id| id + 1);
        if start >= end {
            info!("{table:?} already covers ids up to {end}");
            return Ok(None);
        }
        info!("resuming at id {start}");
        self.run(start, end, table, progress_bar).map(Some)
    }

    fn probe(&self, id: u64) -> Result<Option<LookupEntry>, PortalError> {
        let Some(header) = self.fetch.content_disposition(&self.endpoints.op(id))? else {
            return Ok(None);
        };
        let entry = parse_content_disposition(&header).and_then(|name| parse_op_filename(id, name));
        if entry.is_none() {
            debug!("id {id}: ignoring {header:?}");
        }
        Ok(entry)
    }
}

/// Returns the `filename` parameter of a `Content-Disposition` value.
pub fn parse_content_disposition(header: &str) -> Option<&str> {
    header.split(';').find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("filename")
            .then(|| value.trim().trim_matches('"'))
            .filter(|name| !name.is_empty())
    })
}

/// Parses an orthophoto archive name such as
/// `dop_32632_5650_1_th_2014.zip`.
///
/// The easting field carries the UTM zone as a `32` prefix, either
/// fused (`32632`) or as a field of its own (`32_632`). The year is the
/// last four characters before `.zip`.
pub fn parse_op_filename(id: u64, name: &str) -> Option<LookupEntry> {
    if !name.contains("dop") {
        return None;
    }
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    let year = stem
        .len()
        .checked_sub(4)
        .and_then(|idx| stem.get(idx..))
        .and_then(|year| year.parse::<u16>().ok())?;

    let mut fields = stem.split('_').skip(1);
    let easting = match fields.next()? {
        "32" => fields.next()?,
        field => field.strip_prefix("32").filter(|rest| !rest.is_empty())?,
    };
    let northing = fields.next()?;
    let tilename = TileName::new(easting.parse().ok()?, northing.parse().ok()?);
    Some(LookupEntry { id, year, tilename })
}
