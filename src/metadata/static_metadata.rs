use std::collections::HashMap;

use crate::metadata::{EntityMetadata, MetadataError, MetadataSource};

/// A fixed catalog held in memory, e.g. loaded from a JSON snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadata {
    entities: HashMap<String, EntityMetadata>,
}

impl StaticMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, entity: EntityMetadata) -> Self {
        self.insert(entity);
        self
    }

    pub fn insert(&mut self, entity: EntityMetadata) {
        self.entities.insert(entity.logical_name.to_ascii_lowercase(), entity);
    }

    /// Load a JSON array of entity documents.
    pub fn from_json_str(json: &str) -> Result<Self, MetadataError> {
        let list: Vec<EntityMetadata> = serde_json::from_str(json)
            .map_err(|e| MetadataError::Source(format!("invalid metadata document: {e}")))?;
        let mut catalog = Self::new();
        for entity in list {
            catalog.insert(entity);
        }
        Ok(catalog)
    }
}

impl MetadataSource for StaticMetadata {
    fn fetch(&self, entity_name: &str) -> Result<EntityMetadata, MetadataError> {
        self.entities.get(&entity_name.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(entity_name.to_string()))
    }
}
