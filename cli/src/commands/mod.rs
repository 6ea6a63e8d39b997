use clap::Parser;

mod completion;
mod map;
mod monitor;

#[derive(Parser)]
pub enum Subcommand {
    /// Assemble a board and drive it interactively
    Monitor(self::monitor::MonitorOpt),

    /// Print the physical address decoder table
    Map(self::map::MapOpt),

    /// Generate shell completions
    Completion(self::completion::CompletionOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Monitor(opt) => opt.exec(),
            Subcommand::Map(opt) => opt.exec(),
            Subcommand::Completion(opt) => opt.exec(),
        }
    }
}
