use crate::ast::{ComparatorOp, ScalarExpr, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not { inner: Box<Predicate>, span: Span },

    Compare { left: ScalarExpr, op: ComparatorOp, right: ScalarExpr, span: Span },
    IsNull  { expr: ScalarExpr, negated: bool, span: Span },
    InList  { expr: ScalarExpr, list: Vec<ScalarExpr>, negated: bool, span: Span },
    Like    { expr: ScalarExpr, pattern: ScalarExpr, negated: bool, span: Span },
}

impl Predicate {
    pub fn span(&self) -> Span {
        match self {
            Predicate::And(v) | Predicate::Or(v) => v.iter()
                .map(Predicate::span)
                .reduce(Span::merge)
                .unwrap_or_default(),
            Predicate::Not { span, .. }
            | Predicate::Compare { span, .. }
            | Predicate::IsNull { span, .. }
            | Predicate::InList { span, .. }
            | Predicate::Like { span, .. } => *span,
        }
    }

    pub fn compare(left: ScalarExpr, op: ComparatorOp, right: ScalarExpr) -> Self {
        let span = left.span().merge(right.span());
        Predicate::Compare { left, op, right, span }
    }
}
