use crate::ast::{JoinType, TableExpr};
use crate::compiler::{BindingRole, CompileContext, CompileError, JoinResolver};
use crate::query::{FetchQuery, LinkType};

pub struct TableResolver;

impl TableResolver {
    /// Binds every table of FROM, left to right, and returns the document
    /// rooted at the first one with every explicit JOIN linked in.
    pub fn resolve_from(from: &TableExpr, ctx: &mut CompileContext) -> Result<FetchQuery, CompileError> {
        match from {
            TableExpr::Table(table) => {
                let binding = ctx.bind(table, BindingRole::Root)?;
                Ok(FetchQuery::new(&binding.entity.logical_name))
            }
            TableExpr::Join { left, right, join_type, on, span } => {
                let mut query = Self::resolve_from(left, ctx)?;
                let TableExpr::Table(right) = right.as_ref() else {
                    return CompileError::unsupported("the right side of a JOIN must be a single table", right.span()).err();
                };
                let link_type = match join_type {
                    JoinType::Inner => LinkType::Inner,
                    JoinType::LeftOuter => LinkType::Outer,
                    JoinType::Cross => {
                        if on.is_some() {
                            return CompileError::parse("CROSS JOIN cannot have an ON condition", *span).err();
                        }
                        ctx.bind(right, BindingRole::Pending)?;
                        return Ok(query);
                    }
                    JoinType::RightOuter | JoinType::FullOuter => {
                        return CompileError::unsupported("only INNER and LEFT OUTER joins are supported", *span).err();
                    }
                };
                let Some(on) = on else {
                    return CompileError::parse("JOIN requires an ON condition", *span).err();
                };
                ctx.bind(right, BindingRole::Link)?;
                JoinResolver::resolve_on(on, right.visible_name(), link_type, *span, ctx, &mut query)?;
                Ok(query)
            }
        }
    }
}
