use std::fmt;

use crate::ast::{Predicate, Span};

#[derive(Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
    pub span: Span,
}

impl TableRef {
    pub fn new(name: &str, alias: Option<&str>, span: Span) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            span,
        }
    }

    /// Name other clauses use to refer to this table.
    pub fn visible_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Debug for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "TableRef({} AS {})", self.name, alias),
            None => write!(f, "TableRef({})", self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    /// `CROSS JOIN` or a comma in the FROM list.
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableExpr {
    Table(TableRef),
    Join {
        left: Box<TableExpr>,
        right: Box<TableExpr>,
        join_type: JoinType,
        on: Option<Predicate>,
        span: Span,
    },
}

impl TableExpr {
    pub fn table(name: &str, alias: Option<&str>, span: Span) -> Self {
        TableExpr::Table(TableRef::new(name, alias, span))
    }

    pub fn join(self, right: TableRef, join_type: JoinType, on: Option<Predicate>) -> Self {
        let span = self.span().merge(right.span);
        let span = match &on {
            Some(p) => span.merge(p.span()),
            None => span,
        };
        TableExpr::Join {
            left: Box::new(self),
            right: Box::new(TableExpr::Table(right)),
            join_type,
            on,
            span,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TableExpr::Table(t) => t.span,
            TableExpr::Join { span, .. } => *span,
        }
    }
}
