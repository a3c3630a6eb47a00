pub mod row;
pub use row::*;

pub mod helpers;
pub use helpers::*;

pub mod connector;
pub use connector::*;

pub mod host;
pub use host::*;

pub mod execution_error;
pub use execution_error::*;

pub mod execution_state;
pub use execution_state::*;

pub mod result_set;
pub use result_set::*;

pub mod query_executor;
pub use query_executor::*;

mod mutations;

pub mod session;
pub use session::*;

pub use crate::config::{ExecutionConfig, MutationKind};
