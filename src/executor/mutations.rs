use indexmap::IndexMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::coercion::ValueCoercion;
use crate::compiler::{CompileError, CompileErrorKind, CompiledInsertSelect, CompiledMutation, RowBatch};
use crate::config::MutationKind;
use crate::executor::{
    ConfirmationDecision, ExecutionError, ExecutionResult, ExecutionState, MutationBatch, MutationRequest,
    QueryExecutor, Row, StatementKind,
};

impl QueryExecutor<'_> {
    pub(crate) fn insert_values(&mut self, batch: &RowBatch) -> Result<ExecutionResult, ExecutionError> {
        self.transition(ExecutionState::Mutating);
        let requests = batch.rows.iter()
            .map(|attributes| MutationRequest::Create { entity: batch.entity.clone(), attributes: attributes.clone() })
            .collect();
        let count = self.create_one_by_one(requests, &batch.entity_display)?;
        Ok(ExecutionResult::Affected { kind: StatementKind::Insert, entity: batch.entity_display.clone(), count })
    }

    pub(crate) fn insert_select(&mut self, insert: &CompiledInsertSelect) -> Result<ExecutionResult, ExecutionError> {
        let rows = self.select_rows(&insert.source)?;
        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut attributes = IndexMap::new();
            for (column, target) in insert.source.columns.iter().zip(&insert.targets) {
                let value = ValueCoercion::coerce_json(target, &row.value(&column.key))?;
                attributes.insert(target.logical_name.clone(), value);
            }
            requests.push(MutationRequest::Create { entity: insert.entity.clone(), attributes });
        }

        self.transition(ExecutionState::Mutating);
        let count = self.create_one_by_one(requests, &insert.entity_display)?;
        Ok(ExecutionResult::Affected { kind: StatementKind::Insert, entity: insert.entity_display.clone(), count })
    }

    /// UPDATE and DELETE: read the affected ids, confirm, then write in batches.
    pub(crate) fn mutate(&mut self, mutation: &CompiledMutation) -> Result<ExecutionResult, ExecutionError> {
        if self.config.requires_where(mutation.kind) && !mutation.has_filter {
            let setting = format!("require_where_for_{}", mutation.kind.to_string().to_lowercase());
            return Err(ExecutionError::Compile(CompileError::new(
                CompileErrorKind::UnsupportedConstruct,
                format!("{} without a WHERE clause is blocked; set {} to false to allow it", mutation.kind, setting),
                None,
            )));
        }

        self.transition(ExecutionState::Retrieving);
        self.transition(ExecutionState::Paging);
        let rows = self.retrieve_all(&mutation.retrieval)?;

        let ids = rows.iter()
            .map(|row| Self::record_id(row, &mutation.id_key))
            .collect::<Result<Vec<_>, _>>()?;
        let kind = StatementKind::from(mutation.kind);
        if ids.is_empty() {
            return Ok(ExecutionResult::Affected { kind, entity: mutation.entity_display.clone(), count: 0 });
        }

        self.confirm(mutation.kind, ids.len(), &mutation.entity_display)?;

        // a bulk job deletes every matching root record, so TOP and link
        // targets fall back to batches
        if mutation.kind == MutationKind::Delete
            && self.config.use_bulk_delete
            && mutation.retrieval.top.is_none()
            && mutation.entity.eq_ignore_ascii_case(mutation.retrieval.entity_name())
        {
            if self.host.is_cancelled() {
                return Err(ExecutionError::UserCancelled);
            }
            let job = self.connector.submit_bulk_delete_job(&mutation.retrieval)?;
            info!(%job, count = ids.len(), "bulk delete job submitted");
            return Ok(ExecutionResult::BulkDeleteSubmitted { job, count: ids.len() });
        }

        self.transition(ExecutionState::Mutating);
        let requests = ids.into_iter()
            .map(|id| match mutation.kind {
                MutationKind::Update => MutationRequest::Update {
                    entity: mutation.entity.clone(),
                    id,
                    attributes: mutation.values.clone(),
                },
                MutationKind::Delete => MutationRequest::Delete { entity: mutation.entity.clone(), id },
            })
            .collect();
        let count = self.run_batches(requests, kind, &mutation.entity_display)?;
        Ok(ExecutionResult::Affected { kind, entity: mutation.entity_display.clone(), count })
    }

    fn record_id(row: &Row, key: &str) -> Result<Uuid, ExecutionError> {
        let value = row.value(key);
        value.as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| ExecutionError::InvalidRecord(format!("{} is not a record id ({})", value, key)))
    }

    fn confirm(&mut self, kind: MutationKind, count: usize, entity_display: &str) -> Result<(), ExecutionError> {
        if self.confirm_all || !self.config.needs_confirmation(kind, count) {
            return Ok(());
        }
        info!(%kind, count, entity = entity_display, "asking for confirmation");
        match self.host.confirm(kind, count, entity_display) {
            ConfirmationDecision::Yes => Ok(()),
            ConfirmationDecision::AllForSession => {
                self.confirm_all = true;
                Ok(())
            }
            ConfirmationDecision::No => Err(ExecutionError::UserDeclined { kind, count }),
        }
    }

    /// Sends `requests` in `batch_size` chunks. Earlier chunks stay committed
    /// when a later one fails or the user cancels.
    fn run_batches(&mut self, requests: Vec<MutationRequest>, kind: StatementKind, entity_display: &str) -> Result<usize, ExecutionError> {
        let total = requests.len();
        let mut committed = 0;
        for chunk in requests.chunks(self.config.batch_size.max(1)) {
            if self.host.is_cancelled() {
                info!(committed, total, "cancelled between batches");
                return Err(ExecutionError::UserCancelled);
            }
            committed += self.submit(chunk.to_vec(), committed)?;
            self.host.progress(
                &format!("{} {} of {} {} records", kind.progress_verb(), committed, total, entity_display),
                Some(committed as f64 / total as f64),
            );
        }
        Ok(committed)
    }

    fn create_one_by_one(&mut self, requests: Vec<MutationRequest>, entity_display: &str) -> Result<usize, ExecutionError> {
        let total = requests.len();
        let mut created = 0;
        for request in requests {
            if self.host.is_cancelled() {
                info!(created, total, "cancelled between rows");
                return Err(ExecutionError::UserCancelled);
            }
            created += self.submit(vec![request], created)?;
            self.host.progress(
                &format!("Inserted {} of {} {} records", created, total, entity_display),
                Some(created as f64 / total as f64),
            );
        }
        Ok(created)
    }

    fn submit(&self, requests: Vec<MutationRequest>, committed: usize) -> Result<usize, ExecutionError> {
        let size = requests.len();
        let batch = MutationBatch { requests, bypass_custom_plugins: self.config.bypass_custom_plugins };
        debug!(size, committed, "submitting batch");
        let outcome = self.connector
            .execute_batch(&batch)
            .map_err(|fault| ExecutionError::Fault { fault, committed })?;
        match outcome.first_fault() {
            Some(failed) => Err(ExecutionError::Fault { fault: failed.fault.clone(), committed: committed + failed.index }),
            None => Ok(size),
        }
    }
}
