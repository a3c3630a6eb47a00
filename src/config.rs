use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Destructive statement kinds subject to confirmation and WHERE policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Update,
    Delete,
}

impl Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Update => write!(f, "UPDATE"),
            MutationKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Execution policy threaded through compilation and execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub batch_size: usize,
    /// Records requested per retrieve call.
    pub page_size: usize,
    pub max_pages_per_query: usize,
    pub update_warn_threshold: usize,
    pub delete_warn_threshold: usize,
    pub require_where_for_update: bool,
    pub require_where_for_delete: bool,
    /// Skip custom server-side logic. Every mutation then asks for confirmation.
    pub bypass_custom_plugins: bool,
    pub use_bulk_delete: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            page_size: 5000,
            max_pages_per_query: 200,
            update_warn_threshold: 0,
            delete_warn_threshold: 0,
            require_where_for_update: true,
            require_where_for_delete: true,
            bypass_custom_plugins: false,
            use_bulk_delete: false,
        }
    }
}

impl ExecutionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Missing keys keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages_per_query = max_pages;
        self
    }

    pub fn with_warn_threshold(mut self, kind: MutationKind, threshold: usize) -> Self {
        match kind {
            MutationKind::Update => self.update_warn_threshold = threshold,
            MutationKind::Delete => self.delete_warn_threshold = threshold,
        }
        self
    }

    pub fn with_require_where(mut self, kind: MutationKind, required: bool) -> Self {
        match kind {
            MutationKind::Update => self.require_where_for_update = required,
            MutationKind::Delete => self.require_where_for_delete = required,
        }
        self
    }

    pub fn with_bulk_delete(mut self, enabled: bool) -> Self {
        self.use_bulk_delete = enabled;
        self
    }

    pub fn with_bypass_custom_plugins(mut self, enabled: bool) -> Self {
        self.bypass_custom_plugins = enabled;
        self
    }

    pub fn requires_where(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::Update => self.require_where_for_update,
            MutationKind::Delete => self.require_where_for_delete,
        }
    }

    pub fn warn_threshold(&self, kind: MutationKind) -> usize {
        match kind {
            MutationKind::Update => self.update_warn_threshold,
            MutationKind::Delete => self.delete_warn_threshold,
        }
    }

    /// Whether touching `count` records of `kind` needs the user's consent.
    pub fn needs_confirmation(&self, kind: MutationKind, count: usize) -> bool {
        self.bypass_custom_plugins || count > self.warn_threshold(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = ExecutionConfig::from_json_str(r#"{ "batch_size": 250, "use_bulk_delete": true }"#).unwrap();
        assert_eq!(cfg.batch_size, 250);
        assert!(cfg.use_bulk_delete);
        assert_eq!(cfg.page_size, 5000);
        assert_eq!(cfg.max_pages_per_query, 200);
        assert!(cfg.requires_where(MutationKind::Delete));
    }

    #[test]
    fn thresholds_are_exclusive() {
        let cfg = ExecutionConfig::new().with_warn_threshold(MutationKind::Update, 10);
        assert!(!cfg.needs_confirmation(MutationKind::Update, 10));
        assert!(cfg.needs_confirmation(MutationKind::Update, 11));
        assert!(cfg.needs_confirmation(MutationKind::Delete, 1));
        assert!(!cfg.needs_confirmation(MutationKind::Delete, 0));
    }

    #[test]
    fn bypass_always_confirms() {
        let cfg = ExecutionConfig::new()
            .with_warn_threshold(MutationKind::Delete, 100)
            .with_bypass_custom_plugins(true);
        assert!(cfg.needs_confirmation(MutationKind::Delete, 1));
    }
}
