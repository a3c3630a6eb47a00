use std::fmt;

use crate::aggregation::AggregateError;
use crate::coercion::CoercionError;
use crate::compiler::CompileError;
use crate::config::MutationKind;
use crate::executor::ConnectorFault;
use crate::metadata::MetadataError;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    Compile(CompileError),
    Metadata(MetadataError),
    /// A platform fault. `committed` counts records already written by
    /// earlier batches, which stay written.
    Fault { fault: ConnectorFault, committed: usize },
    RetrievalLimitExceeded { entity: String, pages: usize, max_pages: usize },
    UserCancelled,
    UserDeclined { kind: MutationKind, count: usize },
    Coercion { attribute: String, message: String },
    Aggregate(AggregateError),
    /// A retrieved record lacks a usable value, e.g. an id that is not a guid.
    InvalidRecord(String),
}

impl ExecutionError {
    pub fn fault(fault: ConnectorFault) -> Self {
        ExecutionError::Fault { fault, committed: 0 }
    }

    pub fn is_aggregate_limit(&self) -> bool {
        matches!(self, ExecutionError::Fault { fault, .. } if fault.is_aggregate_limit())
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Compile(e) => write!(f, "{}", e),
            ExecutionError::Metadata(e) => write!(f, "{}", e),
            ExecutionError::Fault { fault, committed: 0 } => write!(f, "ExecutionFault: {}", fault),
            ExecutionError::Fault { fault, committed } =>
                write!(f, "ExecutionFault: {} ({} records were already saved and remain saved)", fault, committed),
            ExecutionError::RetrievalLimitExceeded { entity, pages, max_pages } => write!(
                f,
                "RetrievalLimitExceeded: stopped reading {} after {} pages (limit {}). \
                 Narrow the filter or raise max_pages_per_query.",
                entity, pages, max_pages
            ),
            ExecutionError::UserCancelled => write!(f, "UserCancelled: query cancelled by user"),
            ExecutionError::UserDeclined { kind, count } =>
                write!(f, "UserDeclined: {} of {} records cancelled by user", kind, count),
            ExecutionError::Coercion { attribute, message } =>
                write!(f, "TypeCoercionError: {} ({})", message, attribute),
            ExecutionError::Aggregate(e) => write!(f, "AggregateError: {}", e),
            ExecutionError::InvalidRecord(message) => write!(f, "InvalidRecord: {}", message),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<CompileError> for ExecutionError {
    fn from(e: CompileError) -> Self { ExecutionError::Compile(e) }
}

impl From<MetadataError> for ExecutionError {
    fn from(e: MetadataError) -> Self { ExecutionError::Metadata(e) }
}

impl From<AggregateError> for ExecutionError {
    fn from(e: AggregateError) -> Self { ExecutionError::Aggregate(e) }
}

impl From<ConnectorFault> for ExecutionError {
    fn from(fault: ConnectorFault) -> Self { ExecutionError::fault(fault) }
}

impl From<CoercionError> for ExecutionError {
    fn from(e: CoercionError) -> Self {
        ExecutionError::Coercion { attribute: e.attribute().to_string(), message: e.to_string() }
    }
}
