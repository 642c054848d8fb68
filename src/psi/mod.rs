pub mod descriptor;
pub mod nit;
pub mod section;

pub use descriptor::{decode_packed_decimal, parse_satellite_delivery, parse_service_list};
pub use nit::parse_entries;
pub use section::SectionHeader;
