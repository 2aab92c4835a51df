pub mod analytics;
pub mod classify;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod listing;
pub mod page;
pub mod pipeline;
pub mod region_map;
pub mod text;

pub use error::{JunggoError, Result};
