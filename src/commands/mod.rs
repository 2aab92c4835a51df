//! Command implementations for junggo CLI

mod collect;
mod misc;
mod report;

pub use collect::*;
pub use misc::*;
pub use report::*;
