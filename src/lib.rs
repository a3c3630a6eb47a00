pub mod ast;

pub mod metadata;
pub use metadata::{MetadataCache, MetadataSource, StaticMetadata};

pub mod query;
pub use query::FetchQuery;

pub mod coercion;

pub mod config;
pub use config::{ExecutionConfig, MutationKind};

pub mod compiler;
pub use compiler::{CompileError, CompiledStatement, StatementCompiler};

pub mod aggregation;

pub mod executor;
pub use executor::{DataConnector, ExecutionError, ExecutionHost, ExecutionResult, QueryExecutor, Session};

pub mod memory;
pub use memory::MemoryConnector;
