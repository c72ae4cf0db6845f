use const_format::concatcp;

pub mod error;
pub mod state_machine;
pub mod store;
pub mod stream;
mod tracker;

pub use tracker::*;

pub const DATA_DIR: &str = "data/";
pub const STORE_PATH: &str = concatcp!(DATA_DIR, "routes.json");
