//! Parsed SQL statements as handed to the compiler.
//!
//! Tokenizing and parsing happen outside this crate: a front end builds these
//! values (with byte spans into the original text) and passes them to
//! [`crate::compiler::StatementCompiler`].

pub mod span;
pub use span::*;

pub mod literal;
pub use literal::*;

pub mod operators;
pub use operators::*;

pub mod scalar_expr;
pub use scalar_expr::*;

pub mod predicate;
pub use predicate::*;

pub mod table;
pub use table::*;

pub mod statement;
pub use statement::*;
