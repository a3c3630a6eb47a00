use std::fmt;

use crate::ast::{ArithmeticOp, Literal, Span};

/// A column reference, optionally qualified by a table name or alias.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub name: String,
    pub span: Span,
}

impl ColumnRef {
    pub fn new(table: Option<&str>, name: &str, span: Span) -> Self {
        Self {
            table: table.map(str::to_string),
            name: name.to_string(),
            span,
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColumnRef({} @ {})", self, self.span)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<ScalarExpr>,
    pub distinct: bool,
    pub span: Span,
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args = self.args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
        if self.distinct {
            write!(f, "{}(DISTINCT {})", self.name, args)
        } else {
            write!(f, "{}({})", self.name, args)
        }
    }
}

impl fmt::Debug for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionCall({} @ {})", self, self.span)
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum ScalarExpr {
    Literal { value: Literal, span: Span },
    Column(ColumnRef),
    Function(FunctionCall),
    /// `*` or `table.*`
    WildCard { table: Option<String>, span: Span },
    Binary { left: Box<ScalarExpr>, op: ArithmeticOp, right: Box<ScalarExpr>, span: Span },
}

impl ScalarExpr {
    pub fn span(&self) -> Span {
        match self {
            ScalarExpr::Literal { span, .. } => *span,
            ScalarExpr::Column(c) => c.span,
            ScalarExpr::Function(f) => f.span,
            ScalarExpr::WildCard { span, .. } => *span,
            ScalarExpr::Binary { span, .. } => *span,
        }
    }

    pub fn literal(value: Literal, span: Span) -> Self {
        ScalarExpr::Literal { value, span }
    }

    pub fn column(table: Option<&str>, name: &str, span: Span) -> Self {
        ScalarExpr::Column(ColumnRef::new(table, name, span))
    }

    pub fn function(name: &str, args: Vec<ScalarExpr>, distinct: bool, span: Span) -> Self {
        ScalarExpr::Function(FunctionCall {
            name: name.to_string(),
            args,
            distinct,
            span,
        })
    }

    pub fn as_column(&self) -> Option<&ColumnRef> {
        match self {
            ScalarExpr::Column(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            ScalarExpr::Literal { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal { value, .. } => write!(f, "{}", value),
            ScalarExpr::Column(c) => write!(f, "{}", c),
            ScalarExpr::Function(fun) => write!(f, "{}", fun),
            ScalarExpr::WildCard { table: Some(t), .. } => write!(f, "{}.*", t),
            ScalarExpr::WildCard { table: None, .. } => write!(f, "*"),
            ScalarExpr::Binary { left, op, right, .. } => write!(f, "{} {} {}", left, op, right),
        }
    }
}

impl fmt::Debug for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal { .. } => write!(f, "Literal({})", self),
            ScalarExpr::Column(_) => write!(f, "Column({})", self),
            ScalarExpr::Function(_) => write!(f, "Function({})", self),
            ScalarExpr::WildCard { .. } => write!(f, "WildCard({})", self),
            ScalarExpr::Binary { .. } => write!(f, "Binary({})", self),
        }
    }
}
