use std::sync::Arc;

use tracing::info_span;

use crate::ast::Statement;
use crate::compiler::{CompiledStatement, StatementCompiler};
use crate::executor::{DataConnector, ExecutionError, ExecutionHost, ExecutionResult, QueryExecutor};

/// Runs statements in source order against one connector.
///
/// A failing statement only fails its own slot. A "yes to all" answer holds
/// until the session is dropped.
pub struct Session {
    compiler: StatementCompiler,
    connector: Arc<dyn DataConnector>,
    host: Arc<dyn ExecutionHost>,
    confirm_all: bool,
}

impl Session {
    pub fn new(compiler: StatementCompiler, connector: Arc<dyn DataConnector>, host: Arc<dyn ExecutionHost>) -> Self {
        Self { compiler, connector, host, confirm_all: false }
    }

    pub fn compiler(&self) -> &StatementCompiler {
        &self.compiler
    }

    pub fn confirmations_suppressed(&self) -> bool {
        self.confirm_all
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<ExecutionResult, ExecutionError> {
        let span = info_span!("statement", kind = statement.kind_name());
        let _entered = span.enter();
        let compiled = self.compiler.compile(statement)?;
        self.run(&compiled)
    }

    /// Executes an already compiled statement with this session's policy.
    pub fn run(&mut self, compiled: &CompiledStatement) -> Result<ExecutionResult, ExecutionError> {
        let mut executor = QueryExecutor::new(self.connector.as_ref(), self.host.as_ref(), self.compiler.config())
            .with_confirm_all(self.confirm_all);
        let result = executor.execute(compiled);
        self.confirm_all = executor.confirm_all();
        result
    }

    pub fn execute_all(&mut self, statements: &[Statement]) -> Vec<Result<ExecutionResult, ExecutionError>> {
        statements.iter().map(|s| self.execute(s)).collect()
    }
}
