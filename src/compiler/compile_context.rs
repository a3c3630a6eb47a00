use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{Span, TableRef};
use crate::compiler::CompileError;
use crate::config::ExecutionConfig;
use crate::metadata::{EntityMetadata, MetadataCache};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingRole {
    Root,
    Link,
    /// Comma-joined table still waiting for its join condition in WHERE.
    Pending,
}

/// A table visible to column references, with the document element it maps to.
#[derive(Debug, Clone)]
pub struct TableBinding {
    pub entity: Arc<EntityMetadata>,
    /// Name column references use: the alias, else the table name.
    pub visible: String,
    pub role: BindingRole,
    pub span: Span,
}

impl TableBinding {
    /// Alias of the owning link element; `None` for the root entity.
    pub fn owner(&self) -> Option<&str> {
        match self.role {
            BindingRole::Root => None,
            BindingRole::Link | BindingRole::Pending => Some(&self.visible),
        }
    }
}

pub struct CompileContext<'a> {
    pub catalog: &'a MetadataCache,
    pub config: &'a ExecutionConfig,
    /// lowercase visible name -> binding, in FROM order
    pub tables: IndexMap<String, TableBinding>,
}

impl<'a> CompileContext<'a> {
    pub fn new(catalog: &'a MetadataCache, config: &'a ExecutionConfig) -> Self {
        Self { catalog, config, tables: IndexMap::new() }
    }

    pub fn entity(&self, name: &str, span: Span) -> Result<Arc<EntityMetadata>, CompileError> {
        self.catalog.get(name).map_err(|e| CompileError::from_metadata(e, span))
    }

    pub fn bind(&mut self, table: &TableRef, role: BindingRole) -> Result<&TableBinding, CompileError> {
        let entity = self.entity(&table.name, table.span)?;
        let visible = table.visible_name().to_string();
        let key = visible.to_ascii_lowercase();
        if self.tables.contains_key(&key) {
            return CompileError::ambiguous(format!("table name or alias '{}' is used more than once", visible), table.span).err();
        }
        let binding = TableBinding { entity, visible, role, span: table.span };
        Ok(self.tables.entry(key).or_insert(binding))
    }

    pub fn binding(&self, visible: &str) -> Option<&TableBinding> {
        self.tables.get(&visible.to_ascii_lowercase())
    }

    pub fn root(&self) -> Option<&TableBinding> {
        self.tables.values().find(|b| b.role == BindingRole::Root)
    }

    pub fn set_role(&mut self, visible: &str, role: BindingRole) {
        if let Some(binding) = self.tables.get_mut(&visible.to_ascii_lowercase()) {
            binding.role = role;
        }
    }

    pub fn pending(&self) -> Vec<&TableBinding> {
        self.tables.values().filter(|b| b.role == BindingRole::Pending).collect()
    }
}
