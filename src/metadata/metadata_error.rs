use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum MetadataError {
    NotFound(String),
    Source(String),
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataError::NotFound(entity) => write!(f, "Unknown entity '{}'", entity),
            MetadataError::Source(message) => write!(f, "Metadata source failed: {}", message),
        }
    }
}

impl std::error::Error for MetadataError {}
