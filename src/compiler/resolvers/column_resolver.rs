use crate::ast::{ColumnRef, Span};
use crate::compiler::{BindingRole, CompileContext, CompileError, TableBinding};
use crate::metadata::AttributeMetadata;

/// A column reference bound to a table and an attribute.
#[derive(Debug, Clone)]
pub struct ResolvedColumn {
    /// Visible name of the table.
    pub table: String,
    pub owner: Option<String>,
    pub role: BindingRole,
    pub attribute: AttributeMetadata,
    pub span: Span,
}

impl ResolvedColumn {
    pub fn of(binding: &TableBinding, attribute: &AttributeMetadata, span: Span) -> Self {
        Self {
            table: binding.visible.clone(),
            owner: binding.owner().map(str::to_string),
            role: binding.role,
            attribute: attribute.clone(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.attribute.logical_name
    }

    pub fn row_key(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}.{}", owner, self.name()),
            None => self.name().to_string(),
        }
    }

    pub fn same_as(&self, other: &ResolvedColumn) -> bool {
        self.table.eq_ignore_ascii_case(&other.table) && self.name() == other.name()
    }
}

pub struct ColumnResolver;

impl ColumnResolver {
    pub fn resolve(col: &ColumnRef, ctx: &CompileContext) -> Result<ResolvedColumn, CompileError> {
        let resolved = match &col.table {
            Some(table) => {
                let binding = ctx.binding(table)
                    .ok_or_else(|| CompileError::unknown(format!("unknown table or alias '{}'", table), col.span))?;
                let attribute = binding.entity.attribute(&col.name).ok_or_else(|| {
                    CompileError::unknown(
                        format!("'{}' is not an attribute of {}", col, binding.entity.logical_name),
                        col.span,
                    )
                })?;
                ResolvedColumn::of(binding, attribute, col.span)
            }
            None => {
                // search every bound table for this column
                let matches: Vec<ResolvedColumn> = ctx.tables.values()
                    .filter_map(|b| b.entity.attribute(&col.name).map(|a| ResolvedColumn::of(b, a, col.span)))
                    .collect();
                match matches.len() {
                    0 => return CompileError::unknown(format!("unknown column '{}'", col.name), col.span).err(),
                    1 => matches.into_iter().next()
                        .ok_or_else(|| CompileError::unknown(format!("unknown column '{}'", col.name), col.span))?,
                    _ => {
                        let candidates = matches.iter()
                            .map(|m| format!("{}.{}", m.table, m.name()))
                            .collect::<Vec<_>>()
                            .join(", ");
                        return CompileError::ambiguous(
                            format!("column '{}' is ambiguous: {}", col.name, candidates),
                            col.span,
                        ).err();
                    }
                }
            }
        };

        if !resolved.attribute.is_valid_for_read {
            return CompileError::unsupported(format!("attribute '{}' cannot be read", col), col.span).err();
        }
        Ok(resolved)
    }

    /// The primary id of the root table, used by `COUNT(*)`.
    pub fn root_primary_id(ctx: &CompileContext, span: Span) -> Result<ResolvedColumn, CompileError> {
        let root = ctx.root().ok_or_else(|| CompileError::parse("statement has no FROM table", span))?;
        Ok(Self::primary_id(root, span))
    }

    pub fn primary_id(binding: &TableBinding, span: Span) -> ResolvedColumn {
        let pk = &binding.entity.primary_id_attribute;
        match binding.entity.attribute(pk) {
            Some(attribute) => ResolvedColumn::of(binding, attribute, span),
            None => ResolvedColumn::of(
                binding,
                &AttributeMetadata::new(pk, crate::metadata::AttributeType::UniqueIdentifier),
                span,
            ),
        }
    }
}
