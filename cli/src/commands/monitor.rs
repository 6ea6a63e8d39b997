use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use twintower_machine::constants as C;
use twintower_machine::{Board, Devices};

#[derive(Parser, Debug)]
pub struct MonitorOpt {
    /// Boot ROM image to place at the top of the address space
    #[clap(short, long)]
    rom: Option<PathBuf>,

    /// ID PROM image, exactly 32 bytes
    #[clap(short, long)]
    prom: Option<PathBuf>,
}

impl MonitorOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        let rom = match &self.rom {
            Some(path) => std::fs::read(path)
                .with_context(|| format!("could not read boot ROM image {}", path.display()))?,
            None => Vec::new(),
        };

        let prom = match &self.prom {
            Some(path) => {
                let image = std::fs::read(path)
                    .with_context(|| format!("could not read ID PROM image {}", path.display()))?;
                image
                    .as_slice()
                    .try_into()
                    .context("the ID PROM image must be exactly 32 bytes")?
            }
            None => [0; C::ID_PROM_SIZE],
        };

        info!(rom = rom.len(), "assembling board");
        let mut board = Board::new(Devices::default(), rom, prom)?;

        crate::interactive::run_monitor(&mut board);
        Ok(())
    }
}
