pub mod cache;
pub mod element;
pub mod registry_source;

pub use cache::*;
pub use element::*;
pub use registry_source::*;
