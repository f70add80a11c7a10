pub mod config;
pub mod errors;
pub mod identifier;
pub mod logging;
pub mod models;
pub mod traits;
pub mod utils;

pub use errors::*;
