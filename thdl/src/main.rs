mod enumerate;
mod options;
mod run;
mod tiles;

use anyhow::Result;
use clap::Parser;
use options::Cli;

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli {
        Cli::Run(run) => run.run(),
        Cli::Tiles(tiles) => tiles.run(),
        Cli::Enumerate(enumerate) => enumerate.run(),
        Cli::Resume(resume) => resume.run(),
    }
}
