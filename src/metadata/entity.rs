use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metadata::AttributeMetadata;

/// Schema of one platform entity.
///
/// Attributes keep the order the catalog reported them in, which is also the
/// order `*` expands to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub logical_name: String,
    pub display_name: String,
    pub primary_id_attribute: String,
    #[serde(default)]
    pub primary_name_attribute: Option<String>,
    #[serde(with = "attribute_list")]
    pub attributes: IndexMap<String, AttributeMetadata>,
}

impl EntityMetadata {
    pub fn new(logical_name: &str, display_name: &str, primary_id_attribute: &str) -> Self {
        Self {
            logical_name: logical_name.to_ascii_lowercase(),
            display_name: display_name.to_string(),
            primary_id_attribute: primary_id_attribute.to_ascii_lowercase(),
            primary_name_attribute: None,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: AttributeMetadata) -> Self {
        self.attributes.insert(attribute.logical_name.clone(), attribute);
        self
    }

    pub fn with_primary_name(mut self, name: &str) -> Self {
        self.primary_name_attribute = Some(name.to_ascii_lowercase());
        self
    }

    /// Case-insensitive attribute lookup.
    pub fn attribute(&self, name: &str) -> Option<&AttributeMetadata> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    pub fn readable_attributes(&self) -> impl Iterator<Item = &AttributeMetadata> {
        self.attributes.values().filter(|a| a.is_valid_for_read)
    }
}

/// Catalog documents list attributes as an array; keep them keyed in memory.
mod attribute_list {
    use indexmap::IndexMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::metadata::AttributeMetadata;

    pub fn serialize<S: Serializer>(map: &IndexMap<String, AttributeMetadata>, s: S) -> Result<S::Ok, S::Error> {
        let list: Vec<&AttributeMetadata> = map.values().collect();
        list.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<IndexMap<String, AttributeMetadata>, D::Error> {
        let list = Vec::<AttributeMetadata>::deserialize(d)?;
        Ok(list.into_iter()
            .map(|mut a| {
                a.logical_name = a.logical_name.to_ascii_lowercase();
                (a.logical_name.clone(), a)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AttributeType;

    #[test]
    fn attribute_lookup_is_case_insensitive_and_ordered() {
        let e = EntityMetadata::new("account", "Account", "accountid")
            .with_attribute(AttributeMetadata::new("accountid", AttributeType::UniqueIdentifier))
            .with_attribute(AttributeMetadata::new("name", AttributeType::String))
            .with_attribute(AttributeMetadata {
                is_valid_for_read: false,
                ..AttributeMetadata::new("hidden", AttributeType::Virtual)
            });

        assert!(e.attribute("NAME").is_some());
        let names: Vec<_> = e.readable_attributes().map(|a| a.logical_name.as_str()).collect();
        assert_eq!(names, vec!["accountid", "name"]);
    }
}
