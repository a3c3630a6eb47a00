use crate::ast::{ColumnRef, ComparatorOp, FunctionCall, Literal, Predicate, ScalarExpr, Span};
use crate::compiler::{ColumnResolver, CompileContext, CompileError, LiteralResolver, ResolvedColumn};
use crate::query::{Condition, ConditionOperator, ConditionValue, FilterNode};

pub struct PredicateResolver;

impl PredicateResolver {
    /// Top-level AND conjuncts, flattening nested ANDs.
    pub fn conjuncts(predicate: &Predicate) -> Vec<&Predicate> {
        match predicate {
            Predicate::And(children) => children.iter().flat_map(Self::conjuncts).collect(),
            other => vec![other],
        }
    }

    /// `a.x = b.y`, the only shape accepted as a join condition.
    pub fn column_equality(predicate: &Predicate) -> Option<(&ColumnRef, &ColumnRef)> {
        match predicate {
            Predicate::Compare { left: ScalarExpr::Column(l), op: ComparatorOp::Eq, right: ScalarExpr::Column(r), .. } => Some((l, r)),
            _ => None,
        }
    }

    /// Filter for a list of AND-ed conjuncts; `None` when the list is empty.
    ///
    /// `scope` names the link the filter is nested in. Conditions on that
    /// table carry no entity name and no other table may be referenced.
    pub fn resolve_conjuncts(
        conjuncts: &[&Predicate],
        ctx: &CompileContext,
        scope: Option<&str>,
    ) -> Result<Option<FilterNode>, CompileError> {
        let mut children = Vec::with_capacity(conjuncts.len());
        for conjunct in conjuncts {
            children.push(Self::resolve(conjunct, ctx, scope)?);
        }
        Ok(match children.len() {
            0 => None,
            1 if matches!(children[0], FilterNode::Group { .. }) => children.pop(),
            _ => Some(FilterNode::and(children)),
        })
    }

    pub fn resolve(predicate: &Predicate, ctx: &CompileContext, scope: Option<&str>) -> Result<FilterNode, CompileError> {
        match predicate {
            Predicate::And(children) | Predicate::Or(children) => {
                let mut nodes = Vec::with_capacity(children.len());
                for child in children {
                    nodes.push(Self::resolve(child, ctx, scope)?);
                }
                Ok(match predicate {
                    Predicate::And(_) => FilterNode::and(nodes),
                    _ => FilterNode::or(nodes),
                })
            }
            Predicate::Not { span, .. } => {
                CompileError::unsupported("NOT is not supported; negate the comparison instead", *span).err()
            }
            Predicate::Compare { left, op, right, span } => match (left, right) {
                (ScalarExpr::Column(col), ScalarExpr::Literal { value, span: lit_span }) => {
                    Self::compare(col, *op, value, *lit_span, ctx, scope)
                }
                (ScalarExpr::Literal { value, span: lit_span }, ScalarExpr::Column(col)) => {
                    Self::compare(col, op.flipped(), value, *lit_span, ctx, scope)
                }
                (ScalarExpr::Column(col), ScalarExpr::Function(function)) if *op == ComparatorOp::Eq => {
                    Self::named_operator(col, function, ctx, scope)
                }
                (ScalarExpr::Column(_), ScalarExpr::Column(_)) => CompileError::unsupported(
                    "comparing two columns is only supported as a join condition",
                    *span,
                ).err(),
                _ => CompileError::unsupported("a condition must compare a column with a literal value", *span).err(),
            },
            Predicate::IsNull { expr, negated, span } => {
                let col = Self::column_operand(expr, *span)?;
                let operator = if *negated { ConditionOperator::NotNull } else { ConditionOperator::Null };
                Self::condition(col, operator, ConditionValue::None, ctx, scope)
            }
            Predicate::InList { expr, list, negated, span } => {
                let col = Self::column_operand(expr, *span)?;
                if list.is_empty() {
                    return CompileError::parse("IN list is empty", *span).err();
                }
                let resolved = ColumnResolver::resolve(col, ctx)?;
                let mut values = Vec::with_capacity(list.len());
                for item in list {
                    let ScalarExpr::Literal { value, span } = item else {
                        return CompileError::unsupported("IN lists may only contain literal values", item.span()).err();
                    };
                    values.push(LiteralResolver::condition_text(&resolved, value, *span)?);
                }
                let operator = if *negated { ConditionOperator::NotIn } else { ConditionOperator::In };
                Self::build(resolved, operator, ConditionValue::List(values), scope)
            }
            Predicate::Like { expr, pattern, negated, span } => {
                let col = Self::column_operand(expr, *span)?;
                let Some(Literal::String(pattern)) = pattern.as_literal() else {
                    return CompileError::unsupported("LIKE needs a string pattern", pattern.span()).err();
                };
                let operator = if *negated { ConditionOperator::NotLike } else { ConditionOperator::Like };
                Self::condition(col, operator, ConditionValue::Single(pattern.clone()), ctx, scope)
            }
        }
    }

    fn column_operand(expr: &ScalarExpr, span: Span) -> Result<&ColumnRef, CompileError> {
        expr.as_column()
            .ok_or_else(|| CompileError::unsupported("the left side of this condition must be a column", span))
    }

    fn compare(
        col: &ColumnRef,
        op: ComparatorOp,
        literal: &Literal,
        literal_span: Span,
        ctx: &CompileContext,
        scope: Option<&str>,
    ) -> Result<FilterNode, CompileError> {
        let resolved = ColumnResolver::resolve(col, ctx)?;
        let text = LiteralResolver::condition_text(&resolved, literal, literal_span)?;
        let operator = match op {
            ComparatorOp::Eq => ConditionOperator::Eq,
            ComparatorOp::NotEq => ConditionOperator::Ne,
            ComparatorOp::Lt => ConditionOperator::Lt,
            ComparatorOp::LtEq => ConditionOperator::Le,
            ComparatorOp::Gt => ConditionOperator::Gt,
            ComparatorOp::GtEq => ConditionOperator::Ge,
        };
        Self::build(resolved, operator, ConditionValue::Single(text), scope)
    }

    fn named_operator(
        col: &ColumnRef,
        function: &FunctionCall,
        ctx: &CompileContext,
        scope: Option<&str>,
    ) -> Result<FilterNode, CompileError> {
        let Some(token) = LiteralResolver::named_operator(&function.name) else {
            return CompileError::unsupported(
                format!("function '{}' is not a known condition operator", function.name),
                function.span,
            ).err();
        };
        let value = match function.args.as_slice() {
            [] => ConditionValue::None,
            [ScalarExpr::Literal { value, span }] => match value.to_value_string() {
                Some(text) => ConditionValue::Single(text),
                None => return CompileError::unsupported("operator argument cannot be NULL", *span).err(),
            },
            [other] => {
                return CompileError::unsupported("operator arguments must be literal values", other.span()).err();
            }
            _ => {
                return CompileError::parse(format!("{} takes at most one argument", function.name), function.span).err();
            }
        };
        Self::condition(col, ConditionOperator::Named(token.to_string()), value, ctx, scope)
    }

    fn condition(
        col: &ColumnRef,
        operator: ConditionOperator,
        value: ConditionValue,
        ctx: &CompileContext,
        scope: Option<&str>,
    ) -> Result<FilterNode, CompileError> {
        let resolved = ColumnResolver::resolve(col, ctx)?;
        Self::build(resolved, operator, value, scope)
    }

    fn build(
        resolved: ResolvedColumn,
        operator: ConditionOperator,
        value: ConditionValue,
        scope: Option<&str>,
    ) -> Result<FilterNode, CompileError> {
        let entity = match (resolved.owner.as_deref(), scope) {
            (owner, scope) if owner == scope => None,
            (owner, None) => owner,
            (_, Some(scope)) => {
                return CompileError::unsupported(
                    format!("conditions in this JOIN may only reference '{}'", scope),
                    resolved.span,
                ).err();
            }
        };
        Ok(FilterNode::Condition(Condition::new(entity, resolved.name(), operator, value)))
    }
}
