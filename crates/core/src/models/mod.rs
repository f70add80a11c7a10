pub mod definition;
pub mod reference;
pub mod request;
pub mod result;

pub use definition::*;
pub use reference::*;
pub use request::*;
pub use result::*;
