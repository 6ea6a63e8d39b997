//! This module implements the TTY interactive monitor.
//!
//! It is mainly based on two crates:
//!   - rustyline, to handle the line-editing logic
//!   - clap, to handle the parsing of those interactive commands
//!
//! Using Parser to do this is a bit of a hack, and requires some weird options
//! to have it working but works nonetheless.

use clap::{Parser, ValueEnum};
use rustyline::{Behavior, CompletionType, Config, EditMode, Editor};
use tracing::{debug, info, warn};
use twintower_machine::board::LioSource;
use twintower_machine::Board;

mod helper;
mod parse;
use self::helper::MonitorHelper;

static HELP: &str = r#"
Run "help [command]" for command-specific help.
An empty line re-runs the last valid command."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    help_template = "{about}\n\nCOMMANDS:\n{subcommands}\n{after-help}",
    after_help = HELP,
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true,
)]
/// Interactive monitor commands
enum Command {
    /// Read words from the bus
    #[command(alias = "r")]
    Read {
        /// The physical address to read from. Accepts decimal, hex (0x),
        /// octal (0o) and binary (0b) literals.
        #[clap(value_parser)]
        address: parse::Literal,

        /// Number of consecutive words to read
        #[clap(value_parser, default_value = "1")]
        number: u32,
    },

    /// Write a word to the bus
    #[command(alias = "w")]
    Write {
        /// The physical address to write to
        #[clap(value_parser)]
        address: parse::Literal,

        /// The word to write
        #[clap(value_parser)]
        value: parse::Literal,
    },

    /// Read single bytes, driving only the matching byte lane
    #[command(alias = "rb")]
    ReadByte {
        /// The physical address to read from
        #[clap(value_parser)]
        address: parse::Literal,

        /// Number of consecutive bytes to read
        #[clap(value_parser, default_value = "1")]
        number: u32,
    },

    /// Write a single byte, driving only the matching byte lane
    #[command(alias = "wb")]
    WriteByte {
        /// The physical address to write to
        #[clap(value_parser)]
        address: parse::Literal,

        /// The byte to write
        #[clap(value_parser)]
        value: parse::Literal,
    },

    /// Drive a local I/O interrupt source
    Irq {
        /// The source to drive
        #[clap(value_enum)]
        source: Source,

        /// Release the (active-low) source instead of asserting it
        #[clap(short, long)]
        release: bool,
    },

    /// Pulse the disk controller DMA request line
    Drq {
        /// Number of byte transfers to pulse
        #[clap(value_parser, default_value = "1")]
        number: u32,
    },

    /// Pulse one of the interval timer's output channels
    Timer {
        /// Channel number (0 or 1)
        #[clap(value_parser)]
        channel: u8,
    },

    /// Show the machine registers
    Status,

    /// Reset the board
    Reset,

    /// Exit the monitor
    Exit,
}

/// Local I/O interrupt sources, as spelled on the command line.
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Source {
    Duart0,
    Duart1,
    Duart2,
    Scsi,
    Mailbox,
    AcFail,
}

impl From<Source> for LioSource {
    fn from(source: Source) -> Self {
        match source {
            Source::Duart0 => LioSource::Duart0,
            Source::Duart1 => LioSource::Duart1,
            Source::Duart2 => LioSource::Duart2,
            Source::Scsi => LioSource::Scsi,
            Source::Mailbox => LioSource::Mailbox,
            Source::AcFail => LioSource::AcFail,
        }
    }
}

pub(crate) fn run_monitor(board: &mut Board) {
    info!("Running the interactive monitor. Type \"help\" to list available commands.");
    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .behavior(Behavior::PreferTerm)
        .auto_add_history(true)
        .build();

    let h: MonitorHelper<Command> = MonitorHelper::new();
    let mut rl = Editor::with_config(config).expect("Initialize terminal input");
    rl.set_helper(Some(h));

    let mut last_command: Option<Command> = None;

    'read: loop {
        let Ok(readline) = rl.readline(">> ") else {
            info!("EOF, exitting");
            return;
        };

        let command = if readline.is_empty() {
            if let Some(command) = &last_command {
                command.clone()
            } else {
                info!("Type \"help\" to get the list of available commands");
                continue 'read;
            }
        } else {
            let Ok(words) = shell_words::split(readline.as_str()) else {
                warn!("Invalid input");
                continue 'read;
            };

            let command = match Command::try_parse_from(words) {
                Ok(command) => command,
                Err(e) => {
                    warn!(error = %e);
                    continue 'read;
                }
            };
            last_command = Some(command.clone());
            command
        };

        debug!("Executing command: {:?}", command);

        match command {
            Command::Exit => break,

            Command::Read { address, number } => {
                for i in 0..number {
                    let address = address.0.wrapping_add(4 * i);
                    let value = board.read_word(address);
                    info!("{:#010x} = {:#010x}", address, value);
                }
            }

            Command::Write { address, value } => {
                board.write_word(address.0, value.0);
            }

            Command::ReadByte { address, number } => {
                for i in 0..number {
                    let address = address.0.wrapping_add(i);
                    let value = board.read_byte(address);
                    info!("{:#010x} = {:#04x}", address, value);
                }
            }

            Command::WriteByte { address, value } => {
                let Ok(value) = u8::try_from(value.0) else {
                    warn!("The value does not fit in a byte");
                    continue 'read;
                };
                board.write_byte(address.0, value);
            }

            Command::Irq { source, release } => {
                board.lio_interrupt(source.into(), release);
                info!("Aggregated status is now {:#04x}", board.lio().status());
            }

            Command::Drq { number } => {
                for _ in 0..number {
                    board.scsi_drq(true);
                }
                info!("DMA pointer is now at {:#010x}", board.dma().address());
            }

            Command::Timer { channel } => {
                if channel > 1 {
                    warn!("Only channels 0 and 1 reach the interrupt controller");
                    continue 'read;
                }
                board.timer_out(channel, true);
            }

            Command::Status => display_status(board),

            Command::Reset => board.reset(),
        }

        // The config register schedules resets; a real CPU would take them
        // at the next instruction boundary.
        if board.reset_pending() {
            info!("Soft reset taken");
            board.reset();
        }
    }
}

fn display_status(board: &Board) {
    let leds: String = board
        .leds()
        .iter()
        .map(|&on| if on { '*' } else { '.' })
        .collect();

    info!("cpucfg = {:#06x}", board.cpucfg().bits());
    info!("leds   = {}", leds);
    info!(
        "lio    = {:#04x} (line {})",
        board.lio().status(),
        if board.lio().line() {
            "asserted"
        } else {
            "released"
        }
    );
    info!(
        "dma    = {:#010x} ({})",
        board.dma().address(),
        if board.dma().to_memory() {
            "to memory"
        } else {
            "to device"
        }
    );
    info!(
        "parity = status {:#04x}, error address {:#010x}, {} bad bytes",
        board.parity().inverted_status(),
        board.parity().error_address(),
        board.parity().bad_bytes()
    );
}
