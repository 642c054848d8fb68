use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context};

use crate::processor::NitScanner;
use crate::registry::ChannelRegistry;
use crate::report::{render, Format};
use crate::types::{Options, ScanConfig, TransportStreamEntry};

const NOT_FOUND: &str = "NIT packets not found. Check recorded channel or time.";

pub fn run(opts: Options) -> anyhow::Result<()> {
    let input = open_input(&opts.input)?;
    let entries = scan_reader(input, &opts.scan, opts.read_buffer_size)?;

    let mut registry = ChannelRegistry::new();
    for entry in &entries {
        if !registry.set_transport_stream_id(entry.transport_stream_id) {
            log::warn!("ignoring TSID 0x{:04X}", entry.transport_stream_id);
        }
    }
    registry.sort_relative_ts_number(opts.sort.unwrap_or(opts.format.default_sort()));

    let data = render(opts.format, &registry)?;
    write_output(opts.output.as_deref(), opts.format, &data)
}

/// Reads `reader` in `buffer_size` chunks until the first complete NIT.
pub fn scan_reader<R: Read>(
    mut reader: R,
    config: &ScanConfig,
    buffer_size: usize,
) -> anyhow::Result<Vec<TransportStreamEntry>> {
    if buffer_size == 0 {
        bail!("read buffer size must be non-zero");
    }

    let mut scanner = NitScanner::new(config.clone());
    let mut buf = vec![0u8; buffer_size];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("failed to read input"),
        };
        if let Some(entries) = scanner.push(&buf[..n]) {
            log::info!("NIT found after {} packets", scanner.packet_count());
            return Ok(entries);
        }
    }

    if let Some(entries) = scanner.finish() {
        return Ok(entries);
    }
    log::debug!("end of input after {} packets", scanner.packet_count());
    bail!(NOT_FOUND)
}

fn open_input(path: &Path) -> anyhow::Result<Box<dyn Read>> {
    if path == Path::new("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    Ok(Box::new(file))
}

fn write_output(path: Option<&Path>, format: Format, data: &[u8]) -> anyhow::Result<()> {
    if path == Some(Path::new("-")) {
        let mut out = io::stdout().lock();
        out.write_all(data)?;
        return Ok(out.flush()?);
    }

    let path = match path {
        Some(p) => p.to_path_buf(),
        None => format.default_file_name().into(),
    };
    let file = File::create(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut out = BufWriter::new(file);
    out.write_all(data)?;
    out.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}
