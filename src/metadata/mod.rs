pub mod attribute;
pub use attribute::*;

pub mod entity;
pub use entity::*;

pub mod metadata_error;
pub use metadata_error::*;

pub mod catalog;
pub use catalog::*;

pub mod static_metadata;
pub use static_metadata::*;
