use std::path::PathBuf;

use clap::Parser;
use clap::builder::RangedU64ValueParser;
use nitscan::constants::{BS_NETWORK_ID, READ_BUFFER_SIZE};
use nitscan::report::Format;
use nitscan::scanner::{Options, run};
use nitscan::{ScanConfig, SortMethod};

/// Extract BS/CS transport stream ids from the NIT of a recorded TS
#[derive(Parser)]
#[clap(version, about)]
struct Opt {
    /// Output format
    #[clap(long, short, value_enum, default_value = "json")]
    format: Format,

    /// Relative TS number ordering (default depends on the format)
    #[clap(long, value_enum)]
    sort: Option<SortMethod>,

    /// network_id the NIT must carry (decimal or 0x-prefixed)
    #[clap(long, value_parser = parse_u16, default_value_t = BS_NETWORK_ID)]
    network_id: u16,

    /// Accept sections without checking their CRC-32
    #[clap(long, default_value_t = false)]
    no_crc: bool,

    /// Bytes per read
    #[clap(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..), default_value_t = READ_BUFFER_SIZE)]
    buffer_size: usize,

    /// Input file, '-' for stdin
    input: PathBuf,

    /// Output file, '-' for stdout; the format's default name when omitted
    output: Option<PathBuf>,
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid value '{s}': {e}"))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let opt = Opt::parse();

    run(Options {
        input: opt.input,
        output: opt.output,
        format: opt.format,
        sort: opt.sort,
        read_buffer_size: opt.buffer_size,
        scan: ScanConfig {
            network_id: opt.network_id,
            verify_crc: !opt.no_crc,
            ..Default::default()
        },
    })
}
