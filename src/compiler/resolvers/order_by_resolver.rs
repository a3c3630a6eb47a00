use std::collections::HashSet;

use crate::ast::{Literal, OrderByItem, ScalarExpr};
use crate::compiler::{AggregateColumn, AggregatePlan, AggregateResolver, ColumnResolver, CompileContext, CompileError, ProjectedColumn, Projection};
use crate::query::{FetchItem, FetchQuery, SortSpec};

pub struct OrderByResolver;

impl OrderByResolver {
    /// Selected column named by an ordinal or a select alias.
    fn projected<'p>(item: &OrderByItem, projection: &'p Projection) -> Result<Option<&'p ProjectedColumn>, CompileError> {
        match &item.expr {
            ScalarExpr::Literal { value: Literal::Int(position), span } => {
                let len = projection.columns.len();
                if *position < 1 || *position as usize > len {
                    return CompileError::unknown(
                        format!("ORDER BY position {} is out of range [1..{}]", position, len),
                        *span,
                    ).err();
                }
                Ok(projection.columns.get(*position as usize - 1))
            }
            ScalarExpr::Literal { span, .. } => {
                CompileError::unsupported("ORDER BY expects a column, an alias or a position", *span).err()
            }
            ScalarExpr::Column(col) if col.table.is_none() => Ok(projection.columns.iter().find(|p| {
                p.select_alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(&col.name))
            })),
            _ => Ok(None),
        }
    }

    /// Sorts of a plain query, placed on the element owning each attribute.
    pub fn resolve_plain(
        order_by: &[OrderByItem],
        projection: &Projection,
        ctx: &CompileContext,
        query: &mut FetchQuery,
    ) -> Result<(), CompileError> {
        let mut seen = HashSet::new();
        for item in order_by {
            let source = match Self::projected(item, projection)? {
                Some(p) => p.source.clone(),
                None => match &item.expr {
                    ScalarExpr::Column(col) => ColumnResolver::resolve(col, ctx)?,
                    other => {
                        return CompileError::unsupported("ORDER BY expects a column, an alias or a position", other.span()).err();
                    }
                },
            };
            if !seen.insert(source.row_key()) {
                continue;
            }
            let items = query.items_of_mut(source.owner.as_deref()).ok_or_else(|| {
                CompileError::unknown(format!("'{}' is not joined to the query", source.table), item.span)
            })?;
            items.push(FetchItem::Order(SortSpec::attribute(source.name(), item.descending)));
        }
        Ok(())
    }

    /// Sorts of an aggregate query, rewritten to aliases, and the plan the
    /// executor needs to reproduce the grouping on the client.
    pub fn resolve_aggregate(
        order_by: &[OrderByItem],
        projection: &Projection,
        ctx: &CompileContext,
        query: &mut FetchQuery,
    ) -> Result<AggregatePlan, CompileError> {
        let mut sort: Vec<(String, bool)> = Vec::new();
        let mut sorts_on_aggregate = false;

        for item in order_by {
            let (alias, is_aggregate) = match Self::projected(item, projection)? {
                Some(p) => (p.output.key.clone(), p.aggregate.is_some()),
                None => Self::aggregate_sort_key(item, projection, ctx)?,
            };
            if sort.iter().any(|(a, _)| a.eq_ignore_ascii_case(&alias)) {
                continue;
            }
            sorts_on_aggregate |= is_aggregate;
            query.entity.items.push(FetchItem::Order(SortSpec::alias(&alias, item.descending)));
            sort.push((alias, item.descending));
        }

        // grouping order: sorted group keys first, the rest ascending
        let mut group_keys: Vec<(String, bool)> = sort.iter()
            .filter(|(alias, _)| projection.group_keys.iter().any(|k| k.alias.eq_ignore_ascii_case(alias)))
            .cloned()
            .collect();
        for key in &projection.group_keys {
            if !group_keys.iter().any(|(a, _)| a.eq_ignore_ascii_case(&key.alias)) {
                group_keys.push((key.alias.clone(), false));
            }
        }

        let mut aggregates: Vec<AggregateColumn> = Vec::new();
        for column in &projection.columns {
            if let Some(kind) = column.aggregate {
                if !aggregates.iter().any(|a| a.alias == column.output.key) {
                    aggregates.push(AggregateColumn { alias: column.output.key.clone(), kind });
                }
            }
        }

        // links sort after the root, so keys spread over links lose the user order
        let keys_in_links = projection.group_keys.iter().any(|k| k.source.owner.is_some());
        let resort_required = !sort.is_empty() && (sorts_on_aggregate || keys_in_links);

        Ok(AggregatePlan { group_keys, aggregates, sort, resort_required })
    }

    fn aggregate_sort_key(item: &OrderByItem, projection: &Projection, ctx: &CompileContext) -> Result<(String, bool), CompileError> {
        match &item.expr {
            ScalarExpr::Column(col) => {
                let source = ColumnResolver::resolve(col, ctx)?;
                projection.group_keys.iter()
                    .find(|k| k.source.same_as(&source))
                    .map(|k| (k.alias.clone(), false))
                    .ok_or_else(|| CompileError::unsupported(
                        format!("'{}' is not a group key; ORDER BY on an aggregate query must use a selected alias", col),
                        col.span,
                    ))
            }
            ScalarExpr::Function(function) if AggregateResolver::is_aggregate_name(&function.name) => {
                let (kind, source) = AggregateResolver::resolve_call(function, ctx)?;
                projection.columns.iter()
                    .find(|p| p.aggregate == Some(kind) && p.source.same_as(&source))
                    .map(|p| (p.output.key.clone(), true))
                    .ok_or_else(|| CompileError::unsupported(
                        format!("{} must also be selected to sort by it", function),
                        function.span,
                    ))
            }
            other => CompileError::unsupported("ORDER BY on an aggregate query must use a selected alias", other.span()).err(),
        }
    }
}
