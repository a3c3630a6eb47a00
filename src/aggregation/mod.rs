pub mod aggregate_error;
pub use aggregate_error::*;

pub mod accumulator;
pub use accumulator::*;

pub mod functions;
pub use functions::*;

pub mod aggregation_engine;
pub use aggregation_engine::*;
