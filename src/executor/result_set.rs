use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::compiler::OutputColumn;
use crate::config::MutationKind;
use crate::executor::{JobHandle, Row};

/// Tabular SELECT output, one value per column per row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn from_rows(columns: &[OutputColumn], rows: Vec<Row>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.name.clone()).collect(),
            rows: rows.iter().map(|r| columns.iter().map(|c| r.value(&c.key)).collect()).collect(),
        }
    }

    pub fn len(&self) -> usize { self.rows.len() }
    pub fn is_empty(&self) -> bool { self.rows.is_empty() }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    /// Values of one column, top to bottom.
    pub fn values(&self, name: &str) -> Vec<Value> {
        match self.column(name) {
            Some(i) => self.rows.iter().map(|r| r.get(i).cloned().unwrap_or(Value::Null)).collect(),
            None => vec![],
        }
    }

    /// Rows as JSON objects keyed by column name.
    pub fn to_json(&self) -> Value {
        Value::Array(self.rows.iter().map(|r| {
            let mut obj = Map::new();
            for (name, v) in self.columns.iter().zip(r) {
                obj.insert(name.clone(), v.clone());
            }
            Value::Object(obj)
        }).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    fn past_tense(&self) -> &'static str {
        match self {
            StatementKind::Select => "retrieved",
            StatementKind::Insert => "created",
            StatementKind::Update => "updated",
            StatementKind::Delete => "deleted",
        }
    }

    pub(crate) fn progress_verb(&self) -> &'static str {
        match self {
            StatementKind::Select => "Retrieved",
            StatementKind::Insert => "Inserted",
            StatementKind::Update => "Updated",
            StatementKind::Delete => "Deleted",
        }
    }
}

impl From<MutationKind> for StatementKind {
    fn from(kind: MutationKind) -> Self {
        match kind {
            MutationKind::Update => StatementKind::Update,
            MutationKind::Delete => StatementKind::Delete,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    Rows(ResultSet),
    Affected { kind: StatementKind, entity: String, count: usize },
    BulkDeleteSubmitted { job: JobHandle, count: usize },
}

impl ExecutionResult {
    /// Summary line for the user; `None` for row results.
    pub fn message(&self) -> Option<String> {
        match self {
            ExecutionResult::Rows(_) => None,
            ExecutionResult::Affected { kind, entity, count } =>
                Some(format!("{} {} records {}", count, entity, kind.past_tense())),
            ExecutionResult::BulkDeleteSubmitted { job, count } =>
                Some(format!("Bulk delete job {} submitted for {} records", job, count)),
        }
    }

    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            ExecutionResult::Rows(rs) => Some(rs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn from_rows_reads_columns_by_key() {
        let columns = vec![OutputColumn::new("name", "name"), OutputColumn::new("fullname", "c.fullname")];
        let rows = vec![Row::from_value(json!({"name": "Contoso", "c.fullname": "Ann"})).unwrap()];
        let rs = ResultSet::from_rows(&columns, rows);
        assert_eq!(rs.rows, vec![vec![json!("Contoso"), json!("Ann")]]);
        assert_eq!(rs.values("FULLNAME"), vec![json!("Ann")]);
        assert_eq!(rs.to_json(), json!([{"name": "Contoso", "fullname": "Ann"}]));
    }

    #[test]
    fn summaries() {
        let affected = ExecutionResult::Affected { kind: StatementKind::Update, entity: "Account".into(), count: 3 };
        assert_eq!(affected.message().as_deref(), Some("3 Account records updated"));
        let id = Uuid::new_v4();
        let job = ExecutionResult::BulkDeleteSubmitted { job: JobHandle { id }, count: 9 };
        assert_eq!(job.message(), Some(format!("Bulk delete job {} submitted for 9 records", id)));
        assert!(ExecutionResult::Rows(ResultSet::default()).message().is_none());
    }
}
