use crate::options::Tiles;
use anyhow::Result;
use portal::HttpFetcher;
use std::io::Write;

impl Tiles {
    pub fn run(&self) -> Result<()> {
        let pipeline = self.query.builder().skip_op(self.no_ids).build()?;
        let selection = pipeline.select(&HttpFetcher::new()?)?;

        let mut stdout = std::io::stdout().lock();
        if self.json {
            serde_json::to_writer_pretty(&mut stdout, &selection)?;
            writeln!(stdout)?;
            return Ok(());
        }
        writeln!(stdout, "epoch: {}", selection.epoch)?;
        for tile in &selection.tiles {
            writeln!(stdout, "tile: {tile}")?;
        }
        for (tile, id) in selection.op_tiles.iter().zip(&selection.op_ids) {
            writeln!(stdout, "op: {tile} {id}")?;
        }
        Ok(())
    }
}
