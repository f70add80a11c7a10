//! # Elements Testing Utils
//!
//! Shared testing utilities for the element dispatch workspace: scripted
//! element implementations, a cache store with switchable failures, and
//! builders for definitions and requests.
//!
//! ```toml
//! [dev-dependencies]
//! elements-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
