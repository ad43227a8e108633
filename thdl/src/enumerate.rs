use crate::options::{Enumerate, Resume};
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget};
use portal::{progress, Endpoints, Enumerator, HttpFetcher, Summary};

fn probe_bar(progress_group: &MultiProgress) -> ProgressBar {
    progress_group.add(progress::bar("Probe orthophoto ids".to_string(), 0))
}

fn print_summary(summary: &Summary) {
    println!(
        "probed {} ids, found {} orthophotos, next id {}",
        summary.probed, summary.found, summary.next
    );
}

impl Enumerate {
    pub fn run(&self) -> Result<()> {
        let fetcher = HttpFetcher::new()?;
        let endpoints = Endpoints::new(&self.base_url);
        let progress_group = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(4));
        let summary = Enumerator::new(&fetcher, &endpoints, self.jobs).run(
            self.start,
            self.end,
            &self.out,
            &probe_bar(&progress_group),
        )?;
        print_summary(&summary);
        Ok(())
    }
}

impl Resume {
    pub fn run(&self) -> Result<()> {
        let fetcher = HttpFetcher::new()?;
        let endpoints = Endpoints::new(&self.base_url);
        let progress_group = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(4));
        match Enumerator::new(&fetcher, &endpoints, self.jobs).resume(
            self.end,
            &self.out,
            &probe_bar(&progress_group),
        )? {
            Some(summary) => print_summary(&summary),
            None => println!("{:?} already reaches id {}", self.out, self.end),
        }
        Ok(())
    }
}
