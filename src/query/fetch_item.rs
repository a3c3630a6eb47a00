use serde::{Deserialize, Serialize};

use crate::query::FilterNode;

/// Aggregate applied to a projected attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateKind {
    /// `COUNT(*)`
    Count,
    /// `COUNT(column)`
    CountColumn,
    /// `COUNT(DISTINCT column)`
    CountColumnDistinct,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateKind {
    /// Value of the `aggregate` attribute in the query document.
    pub fn platform_name(&self) -> &'static str {
        match self {
            AggregateKind::Count => "count",
            AggregateKind::CountColumn | AggregateKind::CountColumnDistinct => "countcolumn",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }

    /// Lowercase SQL function name, used for default aliases.
    pub fn function_name(&self) -> &'static str {
        match self {
            AggregateKind::Count | AggregateKind::CountColumn | AggregateKind::CountColumnDistinct => "count",
            AggregateKind::Sum => "sum",
            AggregateKind::Avg => "avg",
            AggregateKind::Min => "min",
            AggregateKind::Max => "max",
        }
    }

    pub fn is_count(&self) -> bool {
        matches!(self, AggregateKind::Count | AggregateKind::CountColumn | AggregateKind::CountColumnDistinct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchAttribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<AggregateKind>,
    #[serde(default)]
    pub group_by: bool,
    #[serde(default)]
    pub distinct: bool,
}

impl FetchAttribute {
    pub fn new(name: &str, alias: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.map(str::to_string),
            aggregate: None,
            group_by: false,
            distinct: false,
        }
    }

    pub fn aggregate(name: &str, alias: &str, kind: AggregateKind) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
            aggregate: Some(kind),
            group_by: false,
            distinct: kind == AggregateKind::CountColumnDistinct,
        }
    }

    pub fn group_key(name: &str, alias: &str) -> Self {
        Self {
            name: name.to_string(),
            alias: Some(alias.to_string()),
            aggregate: None,
            group_by: true,
            distinct: false,
        }
    }

    /// Key under which this attribute's value appears in a retrieved row:
    /// the alias when present, `link.attribute` inside a link, else the name.
    pub fn row_key(&self, owner: Option<&str>) -> String {
        match (&self.alias, owner) {
            (Some(alias), _) => alias.clone(),
            (None, Some(owner)) => format!("{}.{}", owner, self.name),
            (None, None) => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortTarget {
    Attribute(String),
    /// Projection alias; the only valid target in aggregate queries.
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub target: SortTarget,
    pub descending: bool,
}

impl SortSpec {
    pub fn attribute(name: &str, descending: bool) -> Self {
        Self { target: SortTarget::Attribute(name.to_string()), descending }
    }

    pub fn alias(alias: &str, descending: bool) -> Self {
        Self { target: SortTarget::Alias(alias.to_string()), descending }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    Inner,
    Outer,
}

impl LinkType {
    pub fn token(&self) -> &'static str {
        match self {
            LinkType::Inner => "inner",
            LinkType::Outer => "outer",
        }
    }
}

/// A joined entity inside the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchLink {
    pub name: String,
    pub alias: String,
    /// Attribute on the linked entity.
    pub from: String,
    /// Attribute on the parent element.
    pub to: String,
    pub link_type: LinkType,
    pub items: Vec<FetchItem>,
}

impl FetchLink {
    pub fn new(name: &str, alias: &str, from: &str, to: &str, link_type: LinkType) -> Self {
        Self {
            name: name.to_string(),
            alias: alias.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            link_type,
            items: vec![],
        }
    }
}

/// Child element of the root entity or of a link.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchItem {
    AllAttributes,
    Attribute(FetchAttribute),
    Order(SortSpec),
    Filter(FilterNode),
    Link(FetchLink),
}

/// Root entity element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchEntity {
    pub name: String,
    pub items: Vec<FetchItem>,
}

/// Shared accessors for the two element kinds that own items.
pub trait ItemContainer {
    fn items(&self) -> &[FetchItem];
    fn items_mut(&mut self) -> &mut Vec<FetchItem>;

    fn attributes(&self) -> impl Iterator<Item = &FetchAttribute> {
        self.items().iter().filter_map(|i| match i {
            FetchItem::Attribute(a) => Some(a),
            _ => None,
        })
    }

    fn sorts(&self) -> impl Iterator<Item = &SortSpec> {
        self.items().iter().filter_map(|i| match i {
            FetchItem::Order(s) => Some(s),
            _ => None,
        })
    }

    fn links(&self) -> impl Iterator<Item = &FetchLink> {
        self.items().iter().filter_map(|i| match i {
            FetchItem::Link(l) => Some(l),
            _ => None,
        })
    }

    fn filter(&self) -> Option<&FilterNode> {
        self.items().iter().find_map(|i| match i {
            FetchItem::Filter(f) => Some(f),
            _ => None,
        })
    }

    fn push(&mut self, item: FetchItem) {
        self.items_mut().push(item);
    }
}

impl ItemContainer for FetchEntity {
    fn items(&self) -> &[FetchItem] { &self.items }
    fn items_mut(&mut self) -> &mut Vec<FetchItem> { &mut self.items }
}

impl ItemContainer for FetchLink {
    fn items(&self) -> &[FetchItem] { &self.items }
    fn items_mut(&mut self) -> &mut Vec<FetchItem> { &mut self.items }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_keys_follow_alias_then_owner() {
        let plain = FetchAttribute::new("name", None);
        let aliased = FetchAttribute::new("name", Some("n"));
        assert_eq!(plain.row_key(None), "name");
        assert_eq!(plain.row_key(Some("c")), "c.name");
        assert_eq!(aliased.row_key(Some("c")), "n");
    }

    #[test]
    fn container_accessors_filter_by_variant() {
        let mut link = FetchLink::new("contact", "c", "parentcustomerid", "accountid", LinkType::Outer);
        link.push(FetchItem::Attribute(FetchAttribute::new("fullname", None)));
        link.push(FetchItem::Order(SortSpec::attribute("fullname", true)));

        assert_eq!(link.attributes().count(), 1);
        assert_eq!(link.sorts().next(), Some(&SortSpec::attribute("fullname", true)));
        assert!(link.filter().is_none());
        assert_eq!(link.links().count(), 0);
    }

    #[test]
    fn distinct_count_renders_as_countcolumn() {
        let a = FetchAttribute::aggregate("name", "name_count", AggregateKind::CountColumnDistinct);
        assert!(a.distinct);
        assert_eq!(a.aggregate.unwrap().platform_name(), "countcolumn");
    }
}
