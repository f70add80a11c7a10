pub mod file;
pub mod memory;

pub use file::FileRegistrySource;
pub use memory::StaticRegistrySource;
