//! Field extractors. Each turns raw text or payload values into one
//! canonical field, or reports that it found nothing.

pub mod color;
pub mod date;
pub mod json;
pub mod price;
pub mod region;
pub mod storage;

pub use color::Color;
pub use date::PostedAt;
pub use price::RawPrice;
pub use region::{Region, RegionSource};
pub use storage::{Provenance, Storage, StorageCandidate};
