use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use uuid::Uuid;

use crate::coercion::TypedValue;
use crate::executor::Row;
use crate::query::FetchQuery;

/// Error code the platform returns when an aggregate query reads more
/// records than it is allowed to group.
pub const AGGREGATE_LIMIT_FAULT: i64 = -2147164125;

/// A failure reported by the data platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorFault {
    pub code: Option<i64>,
    pub message: String,
}

impl ConnectorFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self { code: None, message: message.into() }
    }

    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self { code: Some(code), message: message.into() }
    }

    pub fn aggregate_limit() -> Self {
        Self::with_code(AGGREGATE_LIMIT_FAULT, "AggregateQueryRecordLimit exceeded. Cannot perform this operation.")
    }

    pub fn is_aggregate_limit(&self) -> bool {
        self.code == Some(AGGREGATE_LIMIT_FAULT) || self.message.contains("AggregateQueryRecordLimit")
    }
}

impl fmt::Display for ConnectorFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ConnectorFault {}

/// One page of a retrieval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrieveResponse {
    pub rows: Vec<Row>,
    pub more_records: bool,
    pub paging_cookie: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "request", rename_all = "lowercase")]
pub enum MutationRequest {
    Create { entity: String, attributes: IndexMap<String, TypedValue> },
    Update { entity: String, id: Uuid, attributes: IndexMap<String, TypedValue> },
    Delete { entity: String, id: Uuid },
}

impl MutationRequest {
    pub fn entity(&self) -> &str {
        match self {
            MutationRequest::Create { entity, .. }
            | MutationRequest::Update { entity, .. }
            | MutationRequest::Delete { entity, .. } => entity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationBatch {
    pub requests: Vec<MutationRequest>,
    pub bypass_custom_plugins: bool,
}

impl MutationBatch {
    pub fn len(&self) -> usize { self.requests.len() }
    pub fn is_empty(&self) -> bool { self.requests.is_empty() }
}

/// A request of a batch that the platform rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFault {
    /// Position of the request in its batch.
    pub index: usize,
    pub fault: ConnectorFault,
}

/// The platform stops a batch at its first failing request; everything
/// before it is committed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub faults: Vec<BatchFault>,
}

impl BatchOutcome {
    pub fn ok() -> Self { Self::default() }

    pub fn first_fault(&self) -> Option<&BatchFault> {
        self.faults.iter().min_by_key(|f| f.index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct JobHandle {
    pub id: Uuid,
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The remote data platform.
pub trait DataConnector {
    fn retrieve(&self, query: &FetchQuery) -> Result<RetrieveResponse, ConnectorFault>;
    fn retrieve_total_count(&self, entity: &str) -> Result<u64, ConnectorFault>;
    fn execute_batch(&self, batch: &MutationBatch) -> Result<BatchOutcome, ConnectorFault>;
    fn submit_bulk_delete_job(&self, query: &FetchQuery) -> Result<JobHandle, ConnectorFault>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_limit_is_recognised_by_code_or_text() {
        assert!(ConnectorFault::aggregate_limit().is_aggregate_limit());
        assert!(ConnectorFault::new("AggregateQueryRecordLimit exceeded").is_aggregate_limit());
        assert!(!ConnectorFault::with_code(-1, "timeout").is_aggregate_limit());
    }

    #[test]
    fn first_fault_is_lowest_index() {
        let outcome = BatchOutcome {
            faults: vec![
                BatchFault { index: 4, fault: ConnectorFault::new("b") },
                BatchFault { index: 2, fault: ConnectorFault::new("a") },
            ],
        };
        assert_eq!(outcome.first_fault().map(|f| f.index), Some(2));
        assert!(BatchOutcome::ok().first_fault().is_none());
    }
}
