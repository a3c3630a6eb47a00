use serde::{Deserialize, Serialize};

use crate::query::{FetchAttribute, FetchEntity, FetchItem, FetchLink, FilterNode, ItemContainer, SortSpec};

/// The query document handed to the data connector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchQuery {
    pub entity: FetchEntity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u32>,
    /// 1-based page number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Page size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paging_cookie: Option<String>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub aggregate: bool,
}

/// An attribute together with the alias of the element that owns it
/// (`None` for the root entity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnedAttribute<'a> {
    pub owner: Option<&'a str>,
    pub attribute: &'a FetchAttribute,
}

impl OwnedAttribute<'_> {
    pub fn row_key(&self) -> String {
        self.attribute.row_key(self.owner)
    }
}

impl FetchQuery {
    pub fn new(entity_name: &str) -> Self {
        Self {
            entity: FetchEntity { name: entity_name.to_string(), items: vec![] },
            top: None,
            page: None,
            count: None,
            paging_cookie: None,
            distinct: false,
            aggregate: false,
        }
    }

    pub fn entity_name(&self) -> &str {
        &self.entity.name
    }

    pub fn filter(&self) -> Option<&FilterNode> {
        self.entity.filter()
    }

    pub fn has_links(&self) -> bool {
        self.entity.links().next().is_some()
    }

    /// Every attribute in document order, root first then each link depth-first.
    pub fn all_attributes(&self) -> Vec<OwnedAttribute<'_>> {
        let mut out = Vec::new();
        Self::collect_attributes(None, self.entity.items(), &mut out);
        out
    }

    fn collect_attributes<'a>(owner: Option<&'a str>, items: &'a [FetchItem], out: &mut Vec<OwnedAttribute<'a>>) {
        for item in items {
            if let FetchItem::Attribute(attribute) = item {
                out.push(OwnedAttribute { owner, attribute });
            }
        }
        for item in items {
            if let FetchItem::Link(link) = item {
                Self::collect_attributes(Some(&link.alias), &link.items, out);
            }
        }
    }

    /// Every link in the document, depth-first.
    pub fn all_links(&self) -> Vec<&FetchLink> {
        let mut out = Vec::new();
        let mut stack: Vec<&FetchLink> = self.entity.links().collect();
        stack.reverse();
        while let Some(link) = stack.pop() {
            out.push(link);
            let mut children: Vec<&FetchLink> = link.links().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    pub fn find_link(&self, alias: &str) -> Option<&FetchLink> {
        self.all_links().into_iter().find(|l| l.alias.eq_ignore_ascii_case(alias))
    }

    pub fn find_link_mut(&mut self, alias: &str) -> Option<&mut FetchLink> {
        Self::find_link_in(&mut self.entity.items, alias)
    }

    fn find_link_in<'a>(items: &'a mut [FetchItem], alias: &str) -> Option<&'a mut FetchLink> {
        for item in items.iter_mut() {
            if let FetchItem::Link(link) = item {
                if link.alias.eq_ignore_ascii_case(alias) {
                    return Some(link);
                }
                if let Some(found) = Self::find_link_in(&mut link.items, alias) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Items of the root (`owner == None`) or of the link with the given alias.
    pub fn items_of_mut(&mut self, owner: Option<&str>) -> Option<&mut Vec<FetchItem>> {
        match owner {
            None => Some(&mut self.entity.items),
            Some(alias) => self.find_link_mut(alias).map(|l| &mut l.items),
        }
    }

    /// The attribute whose alias is `alias`, wherever it lives.
    pub fn find_aliased(&self, alias: &str) -> Option<OwnedAttribute<'_>> {
        self.all_attributes().into_iter().find(|a| {
            a.attribute.alias.as_deref().is_some_and(|x| x.eq_ignore_ascii_case(alias))
        })
    }

    /// Copy of this document without aggregation, grouping, distinct or row
    /// limits, sorted on the given aliased attributes in order.
    ///
    /// The copy returns the raw rows a client needs to compute the same groups
    /// itself: aggregate attributes become plain aliased attributes and every
    /// existing sort is replaced by `group_order`.
    pub fn without_aggregation(&self, group_order: &[(String, bool)]) -> FetchQuery {
        let mut derived = self.clone();
        derived.aggregate = false;
        derived.distinct = false;
        derived.top = None;
        derived.page = None;
        derived.count = None;
        derived.paging_cookie = None;
        Self::strip_aggregation(&mut derived.entity.items);

        for (alias, descending) in group_order {
            let Some((owner, name)) = self.find_aliased(alias)
                .map(|a| (a.owner.map(str::to_string), a.attribute.name.clone())) else {
                continue;
            };
            if let Some(items) = derived.items_of_mut(owner.as_deref()) {
                items.push(FetchItem::Order(SortSpec::attribute(&name, *descending)));
            }
        }
        derived
    }

    fn strip_aggregation(items: &mut Vec<FetchItem>) {
        items.retain(|i| !matches!(i, FetchItem::Order(_)));
        for item in items.iter_mut() {
            match item {
                FetchItem::Attribute(a) => {
                    a.aggregate = None;
                    a.group_by = false;
                    a.distinct = false;
                }
                FetchItem::Link(l) => Self::strip_aggregation(&mut l.items),
                FetchItem::AllAttributes | FetchItem::Order(_) | FetchItem::Filter(_) => {}
            }
        }
    }

    /// Copy addressed at one page of a cookie-driven retrieval.
    pub fn for_page(&self, page: u32, count: u32, paging_cookie: Option<&str>) -> FetchQuery {
        let mut request = self.clone();
        request.page = Some(page);
        request.count = Some(count);
        request.paging_cookie = paging_cookie.map(str::to_string);
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{AggregateKind, LinkType, SortTarget};

    fn grouped() -> FetchQuery {
        let mut q = FetchQuery::new("account");
        q.aggregate = true;
        q.top = Some(5);
        q.entity.push(FetchItem::Attribute(FetchAttribute::group_key("industrycode", "industry")));
        q.entity.push(FetchItem::Attribute(FetchAttribute::aggregate("accountid", "accountid_count", AggregateKind::Count)));
        let mut link = FetchLink::new("contact", "c", "parentcustomerid", "accountid", LinkType::Inner);
        link.push(FetchItem::Attribute(FetchAttribute::group_key("jobtitle", "title")));
        q.entity.push(FetchItem::Link(link));
        q.entity.push(FetchItem::Order(SortSpec::alias("accountid_count", true)));
        q
    }

    #[test]
    fn all_attributes_walks_root_then_links() {
        let q = grouped();
        let keys: Vec<_> = q.all_attributes().iter().map(|a| a.row_key()).collect();
        assert_eq!(keys, vec!["industry", "accountid_count", "title"]);
        assert_eq!(q.find_aliased("TITLE").unwrap().owner, Some("c"));
    }

    #[test]
    fn without_aggregation_derives_a_new_plain_document() {
        let original = grouped();
        let derived = original.without_aggregation(&[("title".into(), true), ("industry".into(), false)]);

        // the compiled document is untouched
        assert_eq!(original, grouped());

        assert!(!derived.aggregate);
        assert_eq!(derived.top, None);
        assert!(derived.all_attributes().iter().all(|a| a.attribute.aggregate.is_none() && !a.attribute.group_by));

        let root_sorts: Vec<_> = derived.entity.sorts().cloned().collect();
        assert_eq!(root_sorts, vec![SortSpec::attribute("industrycode", false)]);
        let link = derived.find_link("c").unwrap();
        let link_sorts: Vec<_> = link.sorts().map(|s| s.target.clone()).collect();
        assert_eq!(link_sorts, vec![SortTarget::Attribute("jobtitle".into())]);
    }

    #[test]
    fn for_page_sets_paging_without_touching_source() {
        let q = FetchQuery::new("account");
        let p = q.for_page(3, 50, Some("<cookie/>"));
        assert_eq!((p.page, p.count, p.paging_cookie.as_deref()), (Some(3), Some(50), Some("<cookie/>")));
        assert_eq!(q.page, None);
    }
}
