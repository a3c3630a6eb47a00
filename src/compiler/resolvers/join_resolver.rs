use tracing::trace;

use crate::ast::{ComparatorOp, Predicate, ScalarExpr, Span};
use crate::compiler::{BindingRole, ColumnResolver, CompileContext, CompileError, PredicateResolver, ResolvedColumn};
use crate::query::{FetchItem, FetchLink, FetchQuery, ItemContainer, LinkType};

pub struct JoinResolver;

impl JoinResolver {
    /// Turns `JOIN <joined> ON ...` into a link under the table it is joined to.
    ///
    /// The ON clause needs exactly one `joined.col = other.col` conjunct. Any
    /// other conjunct must only test `joined` against literals and ends up as
    /// a filter nested in the link.
    pub fn resolve_on(
        on: &Predicate,
        joined: &str,
        link_type: LinkType,
        span: Span,
        ctx: &mut CompileContext,
        query: &mut FetchQuery,
    ) -> Result<(), CompileError> {
        let mut pair = None;
        let mut extra = Vec::new();
        for conjunct in PredicateResolver::conjuncts(on) {
            if let Some((l, r)) = PredicateResolver::column_equality(conjunct) {
                if pair.is_some() {
                    return CompileError::unsupported("a JOIN condition may equate only one pair of columns", conjunct.span()).err();
                }
                pair = Some((ColumnResolver::resolve(l, ctx)?, ColumnResolver::resolve(r, ctx)?, conjunct.span()));
            } else if Self::is_column_comparison(conjunct) {
                return CompileError::unsupported("JOIN columns can only be compared with '='", conjunct.span()).err();
            } else {
                extra.push(conjunct);
            }
        }

        let Some((l, r, pair_span)) = pair else {
            return CompileError::unsupported("a JOIN condition must equate a column of each table", span).err();
        };
        let (joined_col, parent_col) = if l.table.eq_ignore_ascii_case(joined) {
            (l, r)
        } else {
            (r, l)
        };
        if !joined_col.table.eq_ignore_ascii_case(joined)
            || parent_col.table.eq_ignore_ascii_case(joined)
            || parent_col.role == BindingRole::Pending
        {
            return CompileError::unsupported(
                format!("the JOIN condition must equate a column of '{}' with a column of a table joined before it", joined),
                pair_span,
            ).err();
        }

        let mut link = Self::new_link(ctx, &joined_col, &parent_col, link_type);
        if let Some(filter) = PredicateResolver::resolve_conjuncts(&extra, ctx, Some(&joined_col.table))? {
            link.push(FetchItem::Filter(filter));
        }
        Self::attach(query, parent_col.owner.as_deref(), link, pair_span)
    }

    /// Links comma-joined tables through `x.a = y.b` conjuncts at the top level
    /// of WHERE and returns the conjuncts left for the filter.
    ///
    /// Only top-level AND conjuncts qualify; a column pair anywhere else is
    /// rejected later when the filter is built.
    pub fn resolve_implicit<'p>(
        where_clause: Option<&'p Predicate>,
        ctx: &mut CompileContext,
        query: &mut FetchQuery,
    ) -> Result<Vec<&'p Predicate>, CompileError> {
        let conjuncts = where_clause.map(PredicateResolver::conjuncts).unwrap_or_default();
        let mut consumed = vec![false; conjuncts.len()];

        if !ctx.pending().is_empty() {
            loop {
                let mut progressed = false;
                for (i, conjunct) in conjuncts.iter().enumerate() {
                    if consumed[i] {
                        continue;
                    }
                    let Some((l, r)) = PredicateResolver::column_equality(conjunct) else {
                        continue;
                    };
                    let l = ColumnResolver::resolve(l, ctx)?;
                    let r = ColumnResolver::resolve(r, ctx)?;
                    let (joined, parent) = match (l.role, r.role) {
                        (BindingRole::Pending, BindingRole::Root | BindingRole::Link) => (l, r),
                        (BindingRole::Root | BindingRole::Link, BindingRole::Pending) => (r, l),
                        _ => continue,
                    };
                    trace!(joined = %joined.table, parent = %parent.table, "implicit join from WHERE");
                    let link = Self::new_link(ctx, &joined, &parent, LinkType::Inner);
                    Self::attach(query, parent.owner.as_deref(), link, conjunct.span())?;
                    ctx.set_role(&joined.table, BindingRole::Link);
                    consumed[i] = true;
                    progressed = true;
                }
                if !progressed {
                    break;
                }
            }
        }

        if let Some(unlinked) = ctx.pending().first() {
            return CompileError::unsupported(
                format!("'{}' is listed in FROM but no WHERE condition joins it to another table", unlinked.visible),
                unlinked.span,
            ).err();
        }

        Ok(conjuncts.into_iter()
            .zip(consumed)
            .filter_map(|(c, used)| (!used).then_some(c))
            .collect())
    }

    fn is_column_comparison(predicate: &Predicate) -> bool {
        matches!(
            predicate,
            Predicate::Compare { left: ScalarExpr::Column(_), right: ScalarExpr::Column(_), op, .. } if *op != ComparatorOp::Eq
        )
    }

    fn new_link(ctx: &CompileContext, joined: &ResolvedColumn, parent: &ResolvedColumn, link_type: LinkType) -> FetchLink {
        let entity = ctx.binding(&joined.table)
            .map(|b| b.entity.logical_name.clone())
            .unwrap_or_else(|| joined.table.clone());
        FetchLink::new(&entity, &joined.table, joined.name(), parent.name(), link_type)
    }

    fn attach(query: &mut FetchQuery, parent: Option<&str>, link: FetchLink, span: Span) -> Result<(), CompileError> {
        let items = query.items_of_mut(parent)
            .ok_or_else(|| CompileError::unknown(format!("'{}' is not joined yet", parent.unwrap_or_default()), span))?;
        items.push(FetchItem::Link(link));
        Ok(())
    }
}
