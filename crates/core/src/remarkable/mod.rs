//! reMarkable (xochitl) document store access.

pub mod library;
pub mod metadata;

pub use library::{LocalLibrary, XochitlLibrary};
pub use metadata::*;
