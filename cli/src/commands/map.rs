use clap::Parser;
use twintower_machine::constants as C;
use twintower_machine::{Board, Devices};

#[derive(Parser, Debug)]
pub struct MapOpt {}

impl MapOpt {
    pub fn exec(&self) -> anyhow::Result<()> {
        let board = Board::new(Devices::default(), Vec::new(), [0; C::ID_PROM_SIZE])?;

        for binding in board.memory_map().bindings() {
            println!("{binding}");
        }

        Ok(())
    }
}
