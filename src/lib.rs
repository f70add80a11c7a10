pub mod app;
pub mod builtin;

pub use app::{AppMode, Application};
pub use builtin::{builtin_catalog, StaticElement};
