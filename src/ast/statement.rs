use crate::ast::{ColumnRef, Predicate, ScalarExpr, Span, TableExpr, TableRef};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Select(s) => s.span,
            Statement::Insert(s) => s.span,
            Statement::Update(s) => s.span,
            Statement::Delete(s) => s.span,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
        }
    }
}

/// Integer operand of TOP / OFFSET / FETCH with its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCount {
    pub value: i64,
    pub span: Span,
}

/// `OFFSET n ROWS FETCH NEXT m ROWS ONLY`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetFetch {
    pub offset: RowCount,
    pub fetch: RowCount,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    pub expr: ScalarExpr,
    pub alias: Option<String>,
    pub span: Span,
}

impl SelectItem {
    pub fn new(expr: ScalarExpr, alias: Option<&str>) -> Self {
        let span = expr.span();
        Self { expr, alias: alias.map(str::to_string), span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub expr: ScalarExpr,
    pub descending: bool,
    pub span: Span,
}

impl OrderByItem {
    pub fn new(expr: ScalarExpr, descending: bool) -> Self {
        let span = expr.span();
        Self { expr, descending, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub top: Option<RowCount>,
    pub projection: Vec<SelectItem>,
    pub from: TableExpr,
    pub where_clause: Option<Predicate>,
    pub group_by: Vec<ScalarExpr>,
    pub having: Option<Predicate>,
    pub order_by: Vec<OrderByItem>,
    pub offset_fetch: Option<OffsetFetch>,
    pub span: Span,
}

impl SelectStatement {
    /// `SELECT <projection> FROM <from>` with every optional clause empty.
    pub fn new(projection: Vec<SelectItem>, from: TableExpr) -> Self {
        let span = projection.iter()
            .map(|p| p.span)
            .fold(from.span(), Span::merge);
        Self {
            distinct: false,
            top: None,
            projection,
            from,
            where_clause: None,
            group_by: vec![],
            having: None,
            order_by: vec![],
            offset_fetch: None,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    /// One inner vector per `VALUES (...)` row.
    Values(Vec<Vec<ScalarExpr>>),
    Select(Box<SelectStatement>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: TableRef,
    pub columns: Vec<ColumnRef>,
    pub source: InsertSource,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnRef,
    pub value: ScalarExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    /// Table being updated: a table name, or an alias bound in `from`.
    pub target: TableRef,
    pub from: Option<TableExpr>,
    pub assignments: Vec<Assignment>,
    pub where_clause: Option<Predicate>,
    pub top: Option<RowCount>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub target: TableRef,
    pub from: Option<TableExpr>,
    pub where_clause: Option<Predicate>,
    pub top: Option<RowCount>,
    pub span: Span,
}
