use crate::options::{Query, Run};
use anyhow::Result;
use indicatif::{MultiProgress, ProgressDrawTarget};
use portal::{DataDir, Gdal, HttpFetcher, Pipeline, PipelineBuilder};
use tilegrid::MatchMode;

impl Query {
    pub fn builder(&self) -> PipelineBuilder {
        let lookup = self
            .lookup
            .clone()
            .unwrap_or_else(|| DataDir::new(&self.data_dir).lookup_table());
        let match_mode = if self.overlaps {
            MatchMode::Overlaps
        } else {
            MatchMode::Intersects
        };
        Pipeline::builder()
            .data_dir(&self.data_dir)
            .aoi(&self.aoi)
            .year(self.year)
            .lookup(lookup)
            .match_mode(match_mode)
            .grid_name_field(&self.name_field)
            .base_url(&self.base_url)
    }
}

impl Run {
    pub fn run(&self) -> Result<()> {
        let pipeline = self
            .query
            .builder()
            .dem_format(self.format)
            .target_srs(&self.srs)
            .skip_op(self.skip_op)
            .skip_dem(self.skip_dem)
            .build()?;
        let fetcher = HttpFetcher::new()?;
        let progress_group = MultiProgress::with_draw_target(ProgressDrawTarget::stderr_with_hz(4));
        let report = pipeline.run(&fetcher, &Gdal, &progress_group)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
