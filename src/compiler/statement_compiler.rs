use std::sync::Arc;

use tracing::trace;

use crate::ast::{SelectStatement, Statement};
use crate::compiler::{
    CompileContext, CompileError, CompiledSelect, CompiledStatement, JoinResolver, MutationResolver, OrderByResolver,
    PagingResolver, PredicateResolver, ProjectionResolver, TableResolver,
};
use crate::config::ExecutionConfig;
use crate::metadata::MetadataCache;
use crate::query::{FetchItem, FetchQuery};

/// Turns parsed statements into query documents and row batches.
pub struct StatementCompiler {
    catalog: Arc<MetadataCache>,
    config: ExecutionConfig,
}

impl StatementCompiler {
    pub fn new(catalog: Arc<MetadataCache>, config: ExecutionConfig) -> Self {
        Self { catalog, config }
    }

    pub fn catalog(&self) -> &Arc<MetadataCache> {
        &self.catalog
    }

    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    pub fn compile(&self, statement: &Statement) -> Result<CompiledStatement, CompileError> {
        let mut ctx = CompileContext::new(&self.catalog, &self.config);
        let compiled = match statement {
            Statement::Select(select) => CompiledStatement::Select(Self::compile_select(select, &mut ctx)?),
            Statement::Insert(insert) => MutationResolver::insert(insert, &mut ctx)?,
            Statement::Update(update) => CompiledStatement::Mutation(MutationResolver::update(update, &mut ctx)?),
            Statement::Delete(delete) => CompiledStatement::Mutation(MutationResolver::delete(delete, &mut ctx)?),
        };
        trace!(
            kind = statement.kind_name(),
            entity = compiled.query().map(FetchQuery::entity_name).unwrap_or_default(),
            "compiled statement"
        );
        Ok(compiled)
    }

    pub fn compile_select(select: &SelectStatement, ctx: &mut CompileContext) -> Result<CompiledSelect, CompileError> {
        if let Some(having) = &select.having {
            return CompileError::unsupported("HAVING is not supported", having.span()).err();
        }

        let mut query = TableResolver::resolve_from(&select.from, ctx)?;
        let remaining = JoinResolver::resolve_implicit(select.where_clause.as_ref(), ctx, &mut query)?;
        if let Some(filter) = PredicateResolver::resolve_conjuncts(&remaining, ctx, None)? {
            query.entity.items.push(FetchItem::Filter(filter));
        }

        let projection = ProjectionResolver::resolve(select, ctx, &mut query)?;
        let aggregate = if projection.aggregate {
            query.aggregate = true;
            Some(OrderByResolver::resolve_aggregate(&select.order_by, &projection, ctx, &mut query)?)
        } else {
            OrderByResolver::resolve_plain(&select.order_by, &projection, ctx, &mut query)?;
            None
        };
        query.distinct = select.distinct;
        PagingResolver::resolve(select.top.as_ref(), select.offset_fetch.as_ref(), &mut query)?;
        Self::arrange(&mut query.entity.items);

        let root = ctx.root().ok_or_else(|| CompileError::parse("SELECT has no FROM table", select.span))?;
        Ok(CompiledSelect {
            primary_id: root.entity.primary_id_attribute.clone(),
            entity_display: root.entity.display_name.clone(),
            query,
            columns: projection.columns.into_iter().map(|p| p.output).collect(),
            aggregate,
        })
    }

    /// Attributes, then the filter, then links, then sorts, at every level.
    pub fn arrange(items: &mut [FetchItem]) {
        items.sort_by_key(|item| match item {
            FetchItem::AllAttributes | FetchItem::Attribute(_) => 0,
            FetchItem::Filter(_) => 1,
            FetchItem::Link(_) => 2,
            FetchItem::Order(_) => 3,
        });
        for item in items.iter_mut() {
            if let FetchItem::Link(link) = item {
                Self::arrange(&mut link.items);
            }
        }
    }
}
