pub mod compile_error;
pub use compile_error::*;

pub mod compile_context;
pub use compile_context::*;

pub mod compiled;
pub use compiled::*;

pub mod resolvers;
pub use resolvers::*;

pub mod statement_compiler;
pub use statement_compiler::*;
