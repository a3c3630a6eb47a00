use serde_json::json;
use tracing::{debug, info, trace, warn};

use crate::aggregation::{AggregateSpec, AggregationEngine};
use crate::compiler::{AggregatePlan, CompiledSelect, CompiledStatement};
use crate::config::ExecutionConfig;
use crate::executor::{
    DataConnector, ExecutionError, ExecutionHost, ExecutionResult, ExecutionState, Helpers, ResultSet, Row,
};
use crate::query::FetchQuery;

/// Runs one compiled statement against a connector.
///
/// Everything is sequential: one page, batch or row request at a time, with
/// the host polled for cancellation before each of them. The compiled
/// statement is only read; every request is a fresh copy of its document.
pub struct QueryExecutor<'a> {
    pub(crate) connector: &'a dyn DataConnector,
    pub(crate) host: &'a dyn ExecutionHost,
    pub(crate) config: &'a ExecutionConfig,
    pub(crate) confirm_all: bool,
    history: Vec<ExecutionState>,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(connector: &'a dyn DataConnector, host: &'a dyn ExecutionHost, config: &'a ExecutionConfig) -> Self {
        Self { connector, host, config, confirm_all: false, history: vec![ExecutionState::Compiled] }
    }

    /// Starts with confirmations already suppressed by an earlier answer.
    pub fn with_confirm_all(mut self, confirm_all: bool) -> Self {
        self.confirm_all = confirm_all;
        self
    }

    /// Whether the user answered "yes to all" at some point.
    pub fn confirm_all(&self) -> bool {
        self.confirm_all
    }

    pub fn state(&self) -> ExecutionState {
        self.history.last().copied().unwrap_or(ExecutionState::Compiled)
    }

    /// States visited by the last `execute`, in order.
    pub fn history(&self) -> &[ExecutionState] {
        &self.history
    }

    pub fn execute(&mut self, statement: &CompiledStatement) -> Result<ExecutionResult, ExecutionError> {
        self.history = vec![ExecutionState::Compiled];
        let result = match statement {
            CompiledStatement::Select(select) => self.select(select).map(ExecutionResult::Rows),
            CompiledStatement::InsertValues(batch) => self.insert_values(batch),
            CompiledStatement::InsertSelect(insert) => self.insert_select(insert),
            CompiledStatement::Mutation(mutation) => self.mutate(mutation),
        };
        match &result {
            Ok(_) => self.transition(ExecutionState::Completed),
            Err(ExecutionError::UserCancelled) | Err(ExecutionError::UserDeclined { .. }) => {
                self.transition(ExecutionState::Cancelled)
            }
            Err(e) => {
                debug!(error = %e, "statement failed");
                self.transition(ExecutionState::Failed)
            }
        }
        result
    }

    pub(crate) fn transition(&mut self, to: ExecutionState) {
        debug!(from = %self.state(), to = %to, "state transition");
        self.history.push(to);
    }

    pub fn select(&mut self, select: &CompiledSelect) -> Result<ResultSet, ExecutionError> {
        let rows = self.select_rows(select)?;
        Ok(ResultSet::from_rows(&select.columns, rows))
    }

    pub(crate) fn select_rows(&mut self, select: &CompiledSelect) -> Result<Vec<Row>, ExecutionError> {
        self.transition(ExecutionState::Retrieving);
        let entity = select.query.entity_name();

        if let Some(alias) = select.total_count_alias() {
            let total = self.connector.retrieve_total_count(entity)?;
            debug!(entity, total, "answered from the total record count");
            let mut row = Row::new();
            row.insert(alias, json!(total));
            return Ok(vec![row]);
        }

        let Some(plan) = &select.aggregate else {
            self.transition(ExecutionState::Paging);
            return self.retrieve_all(&select.query);
        };

        self.transition(ExecutionState::NativeAggregate);
        match self.retrieve_all(&select.query) {
            Err(e) if e.is_aggregate_limit() => {
                warn!(entity, error = %e, "aggregate record limit reached");
                self.aggregate_locally(select, plan)
            }
            other => other,
        }
    }

    /// Every row of `query`, following paging cookies until the platform
    /// reports no more records.
    ///
    /// A document that already names a row cap or a page is sent once.
    pub fn retrieve_all(&mut self, query: &FetchQuery) -> Result<Vec<Row>, ExecutionError> {
        if self.host.is_cancelled() {
            return Err(ExecutionError::UserCancelled);
        }
        if query.top.is_some() || query.page.is_some() {
            let response = self.connector.retrieve(query)?;
            trace!(page = query.page.unwrap_or(1), rows = response.rows.len(), more = response.more_records, "retrieved page");
            return Ok(response.rows);
        }

        let entity = query.entity_name();
        let count = u32::try_from(self.config.page_size).unwrap_or(u32::MAX);
        let max_pages = self.config.max_pages_per_query;
        let mut rows = Vec::new();
        let mut cookie: Option<String> = None;
        let mut page: u32 = 1;
        loop {
            let response = self.connector.retrieve(&query.for_page(page, count, cookie.as_deref()))?;
            trace!(entity, page, rows = response.rows.len(), more = response.more_records, "retrieved page");
            rows.extend(response.rows);
            if !response.more_records {
                return Ok(rows);
            }

            let fetched = page as usize;
            if max_pages > 0 && fetched >= max_pages {
                return Err(ExecutionError::RetrievalLimitExceeded {
                    entity: entity.to_string(),
                    pages: fetched,
                    max_pages,
                });
            }
            if self.host.is_cancelled() {
                return Err(ExecutionError::UserCancelled);
            }
            self.host.progress(&format!("Retrieved {} {} records so far", rows.len(), entity), None);
            cookie = response.paging_cookie;
            page += 1;
        }
    }

    /// Groups on the client: reads the plain rows behind the aggregate, then
    /// re-applies the sort and row window the platform would have applied.
    fn aggregate_locally(&mut self, select: &CompiledSelect, plan: &AggregatePlan) -> Result<Vec<Row>, ExecutionError> {
        self.transition(ExecutionState::ManualAggregateFallback);
        info!(entity = select.query.entity_name(), groups = plan.group_keys.len(), "aggregating on the client");

        let derived = select.query.without_aggregation(&plan.group_keys);
        let mut raw = self.retrieve_all(&derived)?;
        // link sorts apply after root sorts on the platform
        Helpers::sort_rows(&mut raw, &plan.group_keys);

        let keys = plan.group_keys.iter().map(|(alias, _)| alias.clone()).collect();
        let specs = plan.aggregates.iter().map(|a| AggregateSpec::new(&a.alias, a.kind)).collect();
        let mut grouped = AggregationEngine::aggregate(raw, keys, specs).collect::<Result<Vec<_>, _>>()?;
        if plan.resort_required {
            Helpers::sort_rows(&mut grouped, &plan.sort);
        }

        Ok(match (select.query.top, select.query.page, select.query.count) {
            (Some(top), _, _) => grouped.into_iter().take(top as usize).collect(),
            (None, Some(page), Some(count)) => Helpers::page_window(grouped, page, count),
            _ => grouped,
        })
    }
}
