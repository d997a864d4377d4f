//! bitweave CLI - stream trees from the command line
//!
//! Compose binary data models from JSON layouts, then slice, search, grow and
//! attribute offsets to field names.

mod commands;
mod layout;
mod utils;

use clap::{Args, Parser, Subcommand};
use commands::{LocateQuery, cmd_compose, cmd_find, cmd_grow, cmd_locate, cmd_slice};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bitweave")]
#[command(author, version, about = "Bit-addressable stream trees for fuzzing")]
#[command(long_about = "
bitweave composes binary data models out of bit-granular fields and lets you
inspect them: slice at arbitrary bit offsets, search for byte patterns, grow
seeds by replication and map offsets back to field names.

Examples:
  bitweave compose packet.json -o packet.bin
  bitweave compose packet.json --json
  bitweave slice packet.bin --offset-bits 3 --length-bits 13
  bitweave find packet.bin --text Hello
  bitweave grow seed.bin --bytes 4096 -o big.bin
  bitweave locate packet.json --byte 2
  bitweave locate packet.json --name body
")]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a stream tree from a JSON layout and emit its bytes
    #[command(alias = "c")]
    Compose {
        /// Layout file
        layout: PathBuf,

        /// Output file (hex dump on stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the field map as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Cut a bit range out of a file
    #[command(alias = "s")]
    Slice {
        /// Input file
        file: PathBuf,

        /// Start of the range in bits
        #[arg(long)]
        offset_bits: u64,

        /// Length of the range in bits
        #[arg(long)]
        length_bits: u64,

        /// Output file, zero-padded to a whole byte (hex dump if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Find the first byte-aligned occurrence of a pattern
    #[command(alias = "f")]
    Find {
        /// Input file
        file: PathBuf,

        #[command(flatten)]
        pattern: Pattern,

        /// Bit offset to start searching from
        #[arg(long, default_value_t = 0)]
        from_bits: u64,
    },

    /// Grow a file by replicating its contents
    #[command(alias = "g")]
    Grow {
        /// Input file
        file: PathBuf,

        /// Target length in bytes
        #[arg(short, long)]
        bytes: u64,

        /// Output file (hex dump if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map an offset to a field name, or a field name to an offset
    #[command(alias = "l")]
    Locate {
        /// Layout file
        layout: PathBuf,

        #[command(flatten)]
        target: Target,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Pattern {
    /// Pattern as hex digits
    #[arg(long)]
    hex: Option<String>,

    /// Pattern as UTF-8 text
    #[arg(long)]
    text: Option<String>,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct Target {
    /// Byte offset
    #[arg(long)]
    byte: Option<u64>,

    /// Bit offset
    #[arg(long)]
    bit: Option<u64>,

    /// Field name
    #[arg(long)]
    name: Option<String>,
}

impl Target {
    fn into_query(self) -> Option<LocateQuery> {
        match (self.byte, self.bit, self.name) {
            (Some(byte), _, _) => Some(LocateQuery::Byte(byte)),
            (None, Some(bit), _) => Some(LocateQuery::Bit(bit)),
            (None, None, Some(name)) => Some(LocateQuery::Name(name)),
            (None, None, None) => None,
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compose {
            layout,
            output,
            json,
        } => cmd_compose(&layout, output.as_deref(), json),
        Commands::Slice {
            file,
            offset_bits,
            length_bits,
            output,
        } => cmd_slice(&file, offset_bits, length_bits, output.as_deref()),
        Commands::Find {
            file,
            pattern,
            from_bits,
        } => cmd_find(
            &file,
            pattern.hex.as_deref(),
            pattern.text.as_deref(),
            from_bits,
        ),
        Commands::Grow {
            file,
            bytes,
            output,
        } => cmd_grow(&file, bytes, output.as_deref()),
        Commands::Locate { layout, target } => match target.into_query() {
            Some(query) => cmd_locate(&layout, &query),
            None => Err("one of --byte, --bit or --name is required".into()),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
