pub mod typed_value;
pub use typed_value::*;

pub mod coercion_error;
pub use coercion_error::*;

pub mod value_coercion;
pub use value_coercion::*;
