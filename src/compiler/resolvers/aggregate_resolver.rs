use crate::ast::{FunctionCall, ScalarExpr, SelectStatement};
use crate::compiler::{
    ColumnResolver, CompileContext, CompileError, GroupKey, OutputColumn, ProjectedColumn, Projection,
    ProjectionResolver, ResolvedColumn, UsedAliases,
};
use crate::metadata::AttributeType;
use crate::query::{AggregateKind, FetchAttribute, FetchQuery};

pub struct AggregateResolver;

impl AggregateResolver {
    pub fn is_aggregate_name(name: &str) -> bool {
        matches!(name.to_ascii_lowercase().as_str(), "count" | "sum" | "avg" | "min" | "max")
    }

    pub fn is_aggregate_call(expr: &ScalarExpr) -> bool {
        matches!(expr, ScalarExpr::Function(f) if Self::is_aggregate_name(&f.name))
    }

    /// Kind and argument column of an aggregate call.
    pub fn resolve_call(function: &FunctionCall, ctx: &CompileContext) -> Result<(AggregateKind, ResolvedColumn), CompileError> {
        let name = function.name.to_ascii_lowercase();
        let [arg] = function.args.as_slice() else {
            return CompileError::parse(format!("{} takes exactly one argument", function.name), function.span).err();
        };

        if let ScalarExpr::WildCard { table, span } = arg {
            if name != "count" || table.is_some() || function.distinct {
                return CompileError::unsupported("'*' is only allowed as COUNT(*)", *span).err();
            }
            return Ok((AggregateKind::Count, ColumnResolver::root_primary_id(ctx, *span)?));
        }

        let ScalarExpr::Column(col) = arg else {
            return CompileError::unsupported("aggregate functions take a single column", arg.span()).err();
        };
        let source = ColumnResolver::resolve(col, ctx)?;
        let kind = match (name.as_str(), function.distinct) {
            ("count", false) => AggregateKind::CountColumn,
            ("count", true) => AggregateKind::CountColumnDistinct,
            (_, true) => {
                return CompileError::unsupported("DISTINCT is only supported inside COUNT", function.span).err();
            }
            ("sum", _) => AggregateKind::Sum,
            ("avg", _) => AggregateKind::Avg,
            ("min", _) => AggregateKind::Min,
            ("max", _) => AggregateKind::Max,
            _ => return CompileError::unsupported(format!("unknown aggregate '{}'", function.name), function.span).err(),
        };

        let numeric = matches!(
            source.attribute.attribute_type,
            AttributeType::Integer | AttributeType::BigInt | AttributeType::Decimal | AttributeType::Double | AttributeType::Money
        );
        let ordered = numeric || source.attribute.attribute_type == AttributeType::DateTime;
        match kind {
            AggregateKind::Sum | AggregateKind::Avg if !numeric => CompileError::unsupported(
                format!("{} needs a numeric attribute, '{}' is not", name.to_ascii_uppercase(), col),
                function.span,
            ).err(),
            AggregateKind::Min | AggregateKind::Max if !ordered => CompileError::unsupported(
                format!("{} needs a numeric or date attribute, '{}' is not", name.to_ascii_uppercase(), col),
                function.span,
            ).err(),
            _ => Ok((kind, source)),
        }
    }

    /// Projection of a grouped or aggregate query. Group keys come first in
    /// the document so each has its alias before the select list refers to it.
    pub fn resolve(
        select: &SelectStatement,
        ctx: &CompileContext,
        query: &mut FetchQuery,
        aliases: &mut UsedAliases,
    ) -> Result<Projection, CompileError> {
        let mut group_keys: Vec<GroupKey> = Vec::new();
        for expr in &select.group_by {
            let ScalarExpr::Column(col) = expr else {
                return CompileError::unsupported("GROUP BY supports column references only", expr.span()).err();
            };
            let source = ColumnResolver::resolve(col, ctx)?;
            if group_keys.iter().any(|k| k.source.same_as(&source)) {
                continue;
            }
            // reuse the select alias of the same column, if any
            let selected_alias = select.projection.iter().find_map(|item| {
                let c = item.expr.as_column()?;
                let alias = item.alias.as_ref()?;
                let r = ColumnResolver::resolve(c, ctx).ok()?;
                r.same_as(&source).then(|| alias.clone())
            });
            let alias = match selected_alias {
                Some(alias) => alias,
                None => aliases.claim(source.name()),
            };
            ProjectionResolver::add_attribute(query, &source, FetchAttribute::group_key(source.name(), &alias))?;
            group_keys.push(GroupKey { alias, source });
        }

        let mut columns = Vec::new();
        for item in &select.projection {
            match &item.expr {
                ScalarExpr::Column(col) => {
                    let source = ColumnResolver::resolve(col, ctx)?;
                    let Some(key) = group_keys.iter().find(|k| k.source.same_as(&source)) else {
                        return CompileError::unsupported(
                            format!("'{}' must appear in GROUP BY or inside an aggregate function", col),
                            col.span,
                        ).err();
                    };
                    columns.push(ProjectedColumn {
                        output: OutputColumn::new(item.alias.as_deref().unwrap_or(&col.name), &key.alias),
                        source,
                        aggregate: None,
                        select_alias: item.alias.clone(),
                    });
                }
                ScalarExpr::Function(function) if Self::is_aggregate_name(&function.name) => {
                    let (kind, source) = Self::resolve_call(function, ctx)?;
                    let alias = match &item.alias {
                        Some(alias) => alias.clone(),
                        None => aliases.claim(&format!("{}_{}", source.name(), kind.function_name())),
                    };
                    ProjectionResolver::add_attribute(query, &source, FetchAttribute::aggregate(source.name(), &alias, kind))?;
                    columns.push(ProjectedColumn {
                        output: OutputColumn::new(&alias, &alias),
                        source,
                        aggregate: Some(kind),
                        select_alias: item.alias.clone(),
                    });
                }
                ScalarExpr::WildCard { span, .. } => {
                    return CompileError::unsupported("'*' cannot be selected together with GROUP BY or aggregates", *span).err();
                }
                other => {
                    return CompileError::unsupported("only group keys and aggregate functions can be selected here", other.span()).err();
                }
            }
        }

        Ok(Projection { columns, group_keys, aggregate: true })
    }
}
