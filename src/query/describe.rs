use crate::query::{ConditionValue, FetchAttribute, FetchItem, FetchLink, FetchQuery, FilterNode, ItemContainer, SortSpec, SortTarget};

/// One named property of a document node, as shown by plan viewers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: &'static str,
    pub value: String,
    /// The node owns child nodes described separately.
    pub nested: bool,
}

impl Property {
    fn value(name: &'static str, value: impl ToString) -> Self {
        Self { name, value: value.to_string(), nested: false }
    }

    fn nested(name: &'static str, value: impl ToString) -> Self {
        Self { name, value: value.to_string(), nested: true }
    }
}

pub trait Describe {
    fn describe(&self) -> Vec<Property>;
}

fn describe_children(out: &mut Vec<Property>, items: &[FetchItem]) {
    let attributes = items.iter().filter(|i| matches!(i, FetchItem::Attribute(_) | FetchItem::AllAttributes)).count();
    let links = items.iter().filter(|i| matches!(i, FetchItem::Link(_))).count();
    let sorts = items.iter().filter(|i| matches!(i, FetchItem::Order(_))).count();
    if attributes > 0 {
        out.push(Property::nested("attributes", attributes));
    }
    if items.iter().any(|i| matches!(i, FetchItem::Filter(_))) {
        out.push(Property::nested("filter", "present"));
    }
    if links > 0 {
        out.push(Property::nested("links", links));
    }
    if sorts > 0 {
        out.push(Property::nested("sorts", sorts));
    }
}

impl Describe for FetchQuery {
    fn describe(&self) -> Vec<Property> {
        let mut out = vec![Property::value("entity", &self.entity.name)];
        if let Some(top) = self.top {
            out.push(Property::value("top", top));
        }
        if let (Some(page), Some(count)) = (self.page, self.count) {
            out.push(Property::value("page", page));
            out.push(Property::value("count", count));
        }
        if self.distinct {
            out.push(Property::value("distinct", true));
        }
        if self.aggregate {
            out.push(Property::value("aggregate", true));
        }
        describe_children(&mut out, self.entity.items());
        out
    }
}

impl Describe for FetchLink {
    fn describe(&self) -> Vec<Property> {
        let mut out = vec![
            Property::value("name", &self.name),
            Property::value("alias", &self.alias),
            Property::value("from", &self.from),
            Property::value("to", &self.to),
            Property::value("link-type", self.link_type.token()),
        ];
        describe_children(&mut out, self.items());
        out
    }
}

impl Describe for FetchAttribute {
    fn describe(&self) -> Vec<Property> {
        let mut out = vec![Property::value("name", &self.name)];
        if let Some(alias) = &self.alias {
            out.push(Property::value("alias", alias));
        }
        if let Some(kind) = self.aggregate {
            out.push(Property::value("aggregate", kind.platform_name()));
        }
        if self.group_by {
            out.push(Property::value("groupby", true));
        }
        if self.distinct {
            out.push(Property::value("distinct", true));
        }
        out
    }
}

impl Describe for FilterNode {
    fn describe(&self) -> Vec<Property> {
        match self {
            FilterNode::Condition(c) => {
                let mut out = Vec::new();
                if let Some(entity) = &c.entity {
                    out.push(Property::value("entity", entity));
                }
                out.push(Property::value("attribute", &c.attribute));
                out.push(Property::value("operator", c.operator.token()));
                match &c.value {
                    ConditionValue::None => {}
                    ConditionValue::Single(v) => out.push(Property::value("value", v)),
                    ConditionValue::List(values) => out.push(Property::value("values", values.join(", "))),
                }
                out
            }
            FilterNode::Group { op, children } => vec![
                Property::value("type", op.token()),
                Property::nested("conditions", children.len()),
            ],
        }
    }
}

impl Describe for SortSpec {
    fn describe(&self) -> Vec<Property> {
        let target = match &self.target {
            SortTarget::Attribute(name) => Property::value("attribute", name),
            SortTarget::Alias(alias) => Property::value("alias", alias),
        };
        vec![target, Property::value("descending", self.descending)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::*;

    fn names(props: &[Property]) -> Vec<&'static str> {
        props.iter().map(|p| p.name).collect()
    }

    #[test]
    fn query_reports_flags_and_children() {
        let mut q = FetchQuery::new("account");
        q.distinct = true;
        q.page = Some(2);
        q.count = Some(50);
        q.entity.push(FetchItem::Attribute(FetchAttribute::new("name", None)));
        q.entity.push(FetchItem::Link(FetchLink::new("contact", "c", "parentcustomerid", "accountid", LinkType::Inner)));

        let props = q.describe();
        assert_eq!(names(&props), vec!["entity", "page", "count", "distinct", "attributes", "links"]);
        let links = props.iter().find(|p| p.name == "links").unwrap();
        assert!(links.nested);
        assert_eq!(links.value, "1");
    }

    #[test]
    fn condition_lists_values() {
        let f = FilterNode::Condition(Condition::new(
            Some("c"),
            "statecode",
            ConditionOperator::NotIn,
            ConditionValue::List(vec!["0".into(), "2".into()]),
        ));
        let props = f.describe();
        assert_eq!(names(&props), vec!["entity", "attribute", "operator", "values"]);
        assert_eq!(props[2].value, "not-in");
        assert_eq!(props[3].value, "0, 2");
        assert!(props.iter().all(|p| !p.nested));
    }

    #[test]
    fn sort_and_attribute_are_flat() {
        let s = SortSpec::alias("total", true).describe();
        assert_eq!(s[0], Property { name: "alias", value: "total".into(), nested: false });
        assert_eq!(s[1].value, "true");

        let a = FetchAttribute::aggregate("revenue", "total", AggregateKind::Sum).describe();
        assert_eq!(names(&a), vec!["name", "alias", "aggregate"]);
    }
}
