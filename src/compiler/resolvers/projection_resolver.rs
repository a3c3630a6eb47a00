use std::collections::HashSet;

use crate::ast::{ScalarExpr, SelectStatement, Span};
use crate::compiler::{AggregateResolver, ColumnResolver, CompileContext, CompileError, OutputColumn, ResolvedColumn, TableBinding};
use crate::query::{AggregateKind, FetchAttribute, FetchItem, FetchQuery};

/// One selected column and where its value comes from.
#[derive(Debug, Clone)]
pub struct ProjectedColumn {
    pub output: OutputColumn,
    pub source: ResolvedColumn,
    pub aggregate: Option<AggregateKind>,
    /// Alias written with `AS`.
    pub select_alias: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GroupKey {
    pub alias: String,
    pub source: ResolvedColumn,
}

#[derive(Debug, Clone, Default)]
pub struct Projection {
    pub columns: Vec<ProjectedColumn>,
    pub group_keys: Vec<GroupKey>,
    pub aggregate: bool,
}

/// Aliases taken in one document, compared case-insensitively.
#[derive(Debug, Default)]
pub struct UsedAliases(HashSet<String>);

impl UsedAliases {
    pub fn reserve(&mut self, alias: &str, span: Span) -> Result<(), CompileError> {
        if !self.0.insert(alias.to_ascii_lowercase()) {
            return CompileError::ambiguous(format!("alias '{}' is used more than once", alias), span).err();
        }
        Ok(())
    }

    /// `base`, or `base_1`, `base_2`, ... when taken.
    pub fn claim(&mut self, base: &str) -> String {
        let mut name = base.to_string();
        let mut k = 1usize;
        while self.0.contains(&name.to_ascii_lowercase()) {
            name = format!("{}_{}", base, k);
            k += 1;
        }
        self.0.insert(name.to_ascii_lowercase());
        name
    }
}

pub struct ProjectionResolver;

impl ProjectionResolver {
    pub fn resolve(select: &SelectStatement, ctx: &CompileContext, query: &mut FetchQuery) -> Result<Projection, CompileError> {
        let mut aliases = UsedAliases::default();
        for item in &select.projection {
            if let Some(alias) = &item.alias {
                aliases.reserve(alias, item.span)?;
            }
        }

        let is_aggregate = !select.group_by.is_empty()
            || select.projection.iter().any(|i| AggregateResolver::is_aggregate_call(&i.expr));
        if is_aggregate {
            return AggregateResolver::resolve(select, ctx, query, &mut aliases);
        }

        let mut columns = Vec::new();
        for item in &select.projection {
            match &item.expr {
                ScalarExpr::WildCard { table, span } => {
                    if item.alias.is_some() {
                        return CompileError::parse("'*' cannot have an alias", item.span).err();
                    }
                    let bindings: Vec<TableBinding> = match table {
                        None => ctx.tables.values().cloned().collect(),
                        Some(name) => vec![ctx.binding(name).cloned().ok_or_else(|| {
                            CompileError::unknown(format!("unknown table or alias '{}'", name), *span)
                        })?],
                    };
                    for binding in &bindings {
                        for attribute in binding.entity.readable_attributes() {
                            let source = ResolvedColumn::of(binding, attribute, *span);
                            Self::add_attribute(query, &source, FetchAttribute::new(source.name(), None))?;
                            columns.push(ProjectedColumn {
                                output: OutputColumn::new(source.name(), &source.row_key()),
                                source,
                                aggregate: None,
                                select_alias: None,
                            });
                        }
                    }
                }
                ScalarExpr::Column(col) => {
                    let source = ColumnResolver::resolve(col, ctx)?;
                    let alias = item.alias.as_deref();
                    Self::add_attribute(query, &source, FetchAttribute::new(source.name(), alias))?;
                    let key = alias.map(str::to_string).unwrap_or_else(|| source.row_key());
                    columns.push(ProjectedColumn {
                        output: OutputColumn::new(alias.unwrap_or(source.name()), &key),
                        source,
                        aggregate: None,
                        select_alias: item.alias.clone(),
                    });
                }
                ScalarExpr::Function(function) => {
                    return CompileError::unsupported(
                        format!("function '{}' is not supported in the select list", function.name),
                        function.span,
                    ).err();
                }
                ScalarExpr::Literal { span, .. } | ScalarExpr::Binary { span, .. } => {
                    return CompileError::unsupported("only columns and aggregate functions can be selected", *span).err();
                }
            }
        }

        Ok(Projection { columns, group_keys: vec![], aggregate: false })
    }

    /// Adds `attribute` to the element owning `source` unless it is already there.
    pub fn add_attribute(query: &mut FetchQuery, source: &ResolvedColumn, attribute: FetchAttribute) -> Result<(), CompileError> {
        let items = query.items_of_mut(source.owner.as_deref()).ok_or_else(|| {
            CompileError::unknown(format!("'{}' is not joined to the query", source.table), source.span)
        })?;
        let exists = items.iter().any(|i| matches!(i, FetchItem::Attribute(a) if *a == attribute));
        if !exists {
            items.push(FetchItem::Attribute(attribute));
        }
        Ok(())
    }
}
