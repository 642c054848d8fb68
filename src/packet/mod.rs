pub mod header;
pub mod sync;

pub use header::{payload, PacketHeader};
pub use sync::PacketSynchronizer;
