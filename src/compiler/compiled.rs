use indexmap::IndexMap;

use crate::coercion::TypedValue;
use crate::config::MutationKind;
use crate::metadata::AttributeMetadata;
use crate::query::{AggregateKind, FetchItem, FetchQuery, ItemContainer};

/// One column of a statement's result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputColumn {
    /// Header shown to the user.
    pub name: String,
    /// Key of the value in a retrieved row.
    pub key: String,
}

impl OutputColumn {
    pub fn new(name: &str, key: &str) -> Self {
        Self { name: name.to_string(), key: key.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateColumn {
    pub alias: String,
    pub kind: AggregateKind,
}

/// What the executor needs to aggregate on the client when the platform refuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatePlan {
    /// Group key aliases in the order rows are sorted for grouping.
    pub group_keys: Vec<(String, bool)>,
    pub aggregates: Vec<AggregateColumn>,
    /// ORDER BY as written, by alias.
    pub sort: Vec<(String, bool)>,
    /// Grouped output must be sorted again by `sort`.
    pub resort_required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledSelect {
    pub query: FetchQuery,
    pub columns: Vec<OutputColumn>,
    pub aggregate: Option<AggregatePlan>,
    pub primary_id: String,
    pub entity_display: String,
}

impl CompiledSelect {
    /// Alias of the sole `COUNT` when the query counts every record of the
    /// root entity, which the platform answers without paging.
    pub fn total_count_alias(&self) -> Option<&str> {
        let plan = self.aggregate.as_ref()?;
        if !plan.group_keys.is_empty() || self.query.filter().is_some() || self.query.has_links() {
            return None;
        }
        // the single count row only exists on the first page
        if self.query.page.is_some_and(|p| p > 1) {
            return None;
        }
        let mut attributes = self.query.entity.items().iter().filter(|i| !matches!(i, FetchItem::Order(_)));
        let Some(FetchItem::Attribute(only)) = attributes.next() else {
            return None;
        };
        if attributes.next().is_some() {
            return None;
        }
        match only.aggregate {
            Some(AggregateKind::Count) | Some(AggregateKind::CountColumn)
                if only.name.eq_ignore_ascii_case(&self.primary_id) => only.alias.as_deref(),
            _ => None,
        }
    }
}

/// Literal rows of an `INSERT ... VALUES`.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    pub entity: String,
    pub entity_display: String,
    pub rows: Vec<IndexMap<String, TypedValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInsertSelect {
    pub entity: String,
    pub entity_display: String,
    pub source: CompiledSelect,
    /// Target attribute for each source column, by position.
    pub targets: Vec<AttributeMetadata>,
}

/// `UPDATE` or `DELETE`: a retrieval of the affected ids plus the change to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledMutation {
    pub kind: MutationKind,
    pub entity: String,
    pub entity_display: String,
    pub retrieval: FetchQuery,
    /// Row key holding the id of each affected record.
    pub id_key: String,
    /// SET values; empty for `DELETE`.
    pub values: IndexMap<String, TypedValue>,
    pub has_filter: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompiledStatement {
    Select(CompiledSelect),
    InsertValues(RowBatch),
    InsertSelect(CompiledInsertSelect),
    Mutation(CompiledMutation),
}

impl CompiledStatement {
    /// Document sent to the platform first, if the statement reads at all.
    pub fn query(&self) -> Option<&FetchQuery> {
        match self {
            CompiledStatement::Select(s) => Some(&s.query),
            CompiledStatement::InsertSelect(s) => Some(&s.source.query),
            CompiledStatement::Mutation(m) => Some(&m.retrieval),
            CompiledStatement::InsertValues(_) => None,
        }
    }
}
