pub mod truth;
pub use truth::*;

pub mod eval;
pub use eval::*;

pub mod memory_connector;
pub use memory_connector::*;
