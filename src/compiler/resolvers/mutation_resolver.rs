use indexmap::IndexMap;

use crate::ast::{
    DeleteStatement, InsertSource, InsertStatement, Predicate, RowCount, ScalarExpr, Span, TableExpr, TableRef,
    UpdateStatement,
};
use crate::coercion::ValueCoercion;
use crate::compiler::{
    ColumnResolver, CompileContext, CompileError, CompiledInsertSelect, CompiledMutation, CompiledStatement,
    JoinResolver, PagingResolver, PredicateResolver, ProjectionResolver, RowBatch, StatementCompiler, TableBinding,
    TableResolver,
};
use crate::config::MutationKind;
use crate::metadata::{AttributeMetadata, EntityMetadata};
use crate::query::{FetchAttribute, FetchItem};

pub struct MutationResolver;

impl MutationResolver {
    pub fn insert(insert: &InsertStatement, ctx: &mut CompileContext) -> Result<CompiledStatement, CompileError> {
        let entity = ctx.entity(&insert.table.name, insert.table.span)?;
        if insert.columns.is_empty() {
            return CompileError::parse("INSERT needs a column list", insert.span).err();
        }

        let mut targets: Vec<AttributeMetadata> = Vec::with_capacity(insert.columns.len());
        for col in &insert.columns {
            let attribute = Self::target_attribute(&entity, &col.name, col.span)?;
            if !attribute.is_valid_for_create {
                return CompileError::unsupported(format!("attribute '{}' cannot be set on create", col.name), col.span).err();
            }
            if targets.iter().any(|t| t.logical_name == attribute.logical_name) {
                return CompileError::parse(format!("column '{}' is listed more than once", col.name), col.span).err();
            }
            targets.push(attribute.clone());
        }

        match &insert.source {
            InsertSource::Values(rows) => {
                let mut batch = Vec::with_capacity(rows.len());
                for row in rows {
                    let span = row.iter().map(ScalarExpr::span).reduce(Span::merge).unwrap_or(insert.span);
                    if row.len() != targets.len() {
                        return CompileError::parse(
                            format!("INSERT row has {} values for {} columns", row.len(), targets.len()),
                            span,
                        ).err();
                    }
                    let mut values = IndexMap::with_capacity(row.len());
                    for (attribute, expr) in targets.iter().zip(row) {
                        let ScalarExpr::Literal { value, span } = expr else {
                            return CompileError::unsupported("INSERT VALUES accepts literal values only", expr.span()).err();
                        };
                        let typed = ValueCoercion::coerce_literal(attribute, value)
                            .map_err(|e| CompileError::from_coercion(e, *span))?;
                        values.insert(attribute.logical_name.clone(), typed);
                    }
                    batch.push(values);
                }
                Ok(CompiledStatement::InsertValues(RowBatch {
                    entity: entity.logical_name.clone(),
                    entity_display: entity.display_name.clone(),
                    rows: batch,
                }))
            }
            InsertSource::Select(select) => {
                let mut source_ctx = CompileContext::new(ctx.catalog, ctx.config);
                let source = StatementCompiler::compile_select(select, &mut source_ctx)?;
                if source.columns.len() != targets.len() {
                    return CompileError::parse(
                        format!("INSERT SELECT returns {} columns for {} target columns", source.columns.len(), targets.len()),
                        select.span,
                    ).err();
                }
                Ok(CompiledStatement::InsertSelect(CompiledInsertSelect {
                    entity: entity.logical_name.clone(),
                    entity_display: entity.display_name.clone(),
                    source,
                    targets,
                }))
            }
        }
    }

    pub fn update(update: &UpdateStatement, ctx: &mut CompileContext) -> Result<CompiledMutation, CompileError> {
        let mut mutation = Self::retrieval(
            MutationKind::Update,
            &update.target,
            update.from.as_ref(),
            update.where_clause.as_ref(),
            update.top.as_ref(),
            update.span,
            ctx,
        )?;
        let target = Self::target_binding(&update.target, ctx)?;

        for assignment in &update.assignments {
            let col = &assignment.column;
            if let Some(table) = &col.table {
                if !table.eq_ignore_ascii_case(&target.visible) {
                    return CompileError::unsupported(
                        format!("SET can only change columns of '{}'", target.visible),
                        col.span,
                    ).err();
                }
            }
            let attribute = Self::target_attribute(&target.entity, &col.name, col.span)?;
            if !attribute.is_valid_for_update {
                return CompileError::unsupported(format!("attribute '{}' cannot be updated", col.name), col.span).err();
            }
            if mutation.values.contains_key(&attribute.logical_name) {
                return CompileError::parse(format!("column '{}' is assigned more than once", col.name), assignment.span).err();
            }
            let ScalarExpr::Literal { value, span } = &assignment.value else {
                return CompileError::unsupported("SET accepts literal values only", assignment.value.span()).err();
            };
            let typed = ValueCoercion::coerce_literal(attribute, value)
                .map_err(|e| CompileError::from_coercion(e, *span))?;
            mutation.values.insert(attribute.logical_name.clone(), typed);
        }
        Ok(mutation)
    }

    pub fn delete(delete: &DeleteStatement, ctx: &mut CompileContext) -> Result<CompiledMutation, CompileError> {
        Self::retrieval(
            MutationKind::Delete,
            &delete.target,
            delete.from.as_ref(),
            delete.where_clause.as_ref(),
            delete.top.as_ref(),
            delete.span,
            ctx,
        )
    }

    /// Distinct retrieval of the target's primary id over FROM + WHERE + TOP.
    fn retrieval(
        kind: MutationKind,
        target: &TableRef,
        from: Option<&TableExpr>,
        where_clause: Option<&Predicate>,
        top: Option<&RowCount>,
        span: Span,
        ctx: &mut CompileContext,
    ) -> Result<CompiledMutation, CompileError> {
        let from = from.cloned().unwrap_or_else(|| TableExpr::Table(target.clone()));
        let mut query = TableResolver::resolve_from(&from, ctx)?;

        let remaining = JoinResolver::resolve_implicit(where_clause, ctx, &mut query)?;
        // a WHERE holding only join equalities does not narrow the target
        let has_filter = match PredicateResolver::resolve_conjuncts(&remaining, ctx, None)? {
            Some(filter) => {
                query.entity.items.push(FetchItem::Filter(filter));
                true
            }
            None => false,
        };

        if !has_filter && ctx.config.requires_where(kind) {
            return CompileError::unsupported(
                format!(
                    "{} without WHERE affects every {} record; add a WHERE clause or turn off require_where_for_{}",
                    kind, target.name, kind.to_string().to_ascii_lowercase()
                ),
                span,
            ).err();
        }

        let binding = Self::target_binding(target, ctx)?;
        let id = ColumnResolver::primary_id(&binding, target.span);
        ProjectionResolver::add_attribute(&mut query, &id, FetchAttribute::new(id.name(), None))?;

        query.distinct = true;
        if let Some(top) = top {
            query.top = Some(PagingResolver::top(top)?);
        }
        StatementCompiler::arrange(&mut query.entity.items);

        Ok(CompiledMutation {
            kind,
            entity: binding.entity.logical_name.clone(),
            entity_display: binding.entity.display_name.clone(),
            retrieval: query,
            id_key: id.row_key(),
            values: IndexMap::new(),
            has_filter,
        })
    }

    /// The bound table an UPDATE/DELETE names, by alias or by entity name.
    fn target_binding(target: &TableRef, ctx: &CompileContext) -> Result<TableBinding, CompileError> {
        if let Some(binding) = ctx.binding(target.visible_name()) {
            return Ok(binding.clone());
        }
        let by_name: Vec<&TableBinding> = ctx.tables.values()
            .filter(|b| b.entity.logical_name.eq_ignore_ascii_case(&target.name))
            .collect();
        match by_name.as_slice() {
            [only] => Ok((*only).clone()),
            [] => CompileError::unknown(format!("'{}' is not one of the FROM tables", target.visible_name()), target.span).err(),
            _ => CompileError::ambiguous(format!("'{}' appears more than once in FROM", target.name), target.span).err(),
        }
    }

    fn target_attribute<'e>(entity: &'e EntityMetadata, name: &str, span: Span) -> Result<&'e AttributeMetadata, CompileError> {
        entity.attribute(name).ok_or_else(|| {
            CompileError::unknown(format!("'{}' is not an attribute of {}", name, entity.logical_name), span)
        })
    }
}
