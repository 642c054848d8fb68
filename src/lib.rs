// src/lib.rs
pub mod scanner {
    pub use crate::core::scan_reader;
    pub use crate::types::Options;

    /// Entry-point; returns an error when the input ends without a complete NIT
    pub fn run(opts: Options) -> anyhow::Result<()> {
        crate::core::run(opts)
    }
}

pub mod constants;
pub mod error;
pub mod packet;
pub mod processor;
pub mod psi;
pub mod registry;
pub mod report;
pub mod types;
mod core;

pub use error::{Result, TsError};
pub use processor::{AssemblerEvent, AssemblerState, NitScanner, SectionAssembler};
pub use registry::{ChannelRegistry, SortMethod};
pub use types::{ScanConfig, TransportStreamEntry};
