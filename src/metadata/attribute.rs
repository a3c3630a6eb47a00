use serde::{Deserialize, Serialize};

/// Declared type of an entity attribute on the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Integer,
    BigInt,
    Boolean,
    DateTime,
    Decimal,
    Double,
    String,
    Memo,
    Money,
    Picklist,
    State,
    Status,
    Lookup,
    Customer,
    Owner,
    UniqueIdentifier,
    /// Computed or image/file columns that carry no literal form.
    Virtual,
}

impl AttributeType {
    pub fn is_lookup(&self) -> bool {
        matches!(self, AttributeType::Lookup | AttributeType::Customer | AttributeType::Owner)
    }

    pub fn is_option_set(&self) -> bool {
        matches!(self, AttributeType::Picklist | AttributeType::State | AttributeType::Status)
    }
}

/// A single choice of a picklist/state/status attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionMetadata {
    pub value: i32,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeMetadata {
    pub logical_name: String,
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,
    #[serde(default = "enabled")]
    pub is_valid_for_read: bool,
    #[serde(default = "enabled")]
    pub is_valid_for_create: bool,
    #[serde(default = "enabled")]
    pub is_valid_for_update: bool,
    /// Entities a lookup may point at. More than one means polymorphic.
    #[serde(default)]
    pub lookup_targets: Vec<String>,
    #[serde(default)]
    pub options: Vec<OptionMetadata>,
}

fn enabled() -> bool { true }

impl AttributeMetadata {
    pub fn new(logical_name: &str, attribute_type: AttributeType) -> Self {
        Self {
            logical_name: logical_name.to_ascii_lowercase(),
            attribute_type,
            is_valid_for_read: true,
            is_valid_for_create: true,
            is_valid_for_update: true,
            lookup_targets: vec![],
            options: vec![],
        }
    }

    pub fn lookup(logical_name: &str, targets: &[&str]) -> Self {
        let mut attr = Self::new(logical_name, AttributeType::Lookup);
        attr.lookup_targets = targets.iter().map(|t| t.to_ascii_lowercase()).collect();
        attr
    }

    pub fn picklist(logical_name: &str, options: &[(i32, &str)]) -> Self {
        let mut attr = Self::new(logical_name, AttributeType::Picklist);
        attr.options = options.iter()
            .map(|(value, label)| OptionMetadata { value: *value, label: label.to_string() })
            .collect();
        attr
    }

    pub fn read_only(mut self) -> Self {
        self.is_valid_for_create = false;
        self.is_valid_for_update = false;
        self
    }

    pub fn with_type(mut self, attribute_type: AttributeType) -> Self {
        self.attribute_type = attribute_type;
        self
    }

    pub fn option_by_label(&self, label: &str) -> Option<&OptionMetadata> {
        self.options.iter().find(|o| o.label.eq_ignore_ascii_case(label))
    }
}
