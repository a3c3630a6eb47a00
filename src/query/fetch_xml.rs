use std::fmt::Write;

use crate::query::{Condition, ConditionValue, FetchAttribute, FetchItem, FetchQuery, FilterNode, SortSpec, SortTarget};

impl FetchQuery {
    /// Render the document as FetchXML text.
    pub fn to_fetch_xml(&self) -> String {
        let mut out = String::new();
        let mut attrs = Vec::new();
        if let Some(top) = self.top {
            attrs.push(("top", top.to_string()));
        }
        if self.distinct {
            attrs.push(("distinct", "true".to_string()));
        }
        if self.aggregate {
            attrs.push(("aggregate", "true".to_string()));
        }
        if let Some(page) = self.page {
            attrs.push(("page", page.to_string()));
        }
        if let Some(count) = self.count {
            attrs.push(("count", count.to_string()));
        }
        if let Some(cookie) = &self.paging_cookie {
            attrs.push(("paging-cookie", cookie.clone()));
        }

        open_tag(&mut out, 0, "fetch", &attrs, false);
        open_tag(&mut out, 1, "entity", &[("name", self.entity.name.clone())], false);
        write_items(&mut out, 2, &self.entity.items);
        close_tag(&mut out, 1, "entity");
        close_tag(&mut out, 0, "fetch");
        out
    }
}

fn write_items(out: &mut String, depth: usize, items: &[FetchItem]) {
    for item in items {
        match item {
            FetchItem::AllAttributes => open_tag(out, depth, "all-attributes", &[], true),
            FetchItem::Attribute(a) => write_attribute(out, depth, a),
            FetchItem::Order(s) => write_order(out, depth, s),
            FetchItem::Filter(f) => write_filter(out, depth, f),
            FetchItem::Link(link) => {
                let attrs = [
                    ("name", link.name.clone()),
                    ("from", link.from.clone()),
                    ("to", link.to.clone()),
                    ("alias", link.alias.clone()),
                    ("link-type", link.link_type.token().to_string()),
                ];
                if link.items.is_empty() {
                    open_tag(out, depth, "link-entity", &attrs, true);
                } else {
                    open_tag(out, depth, "link-entity", &attrs, false);
                    write_items(out, depth + 1, &link.items);
                    close_tag(out, depth, "link-entity");
                }
            }
        }
    }
}

fn write_attribute(out: &mut String, depth: usize, a: &FetchAttribute) {
    let mut attrs = vec![("name", a.name.clone())];
    if let Some(alias) = &a.alias {
        attrs.push(("alias", alias.clone()));
    }
    if let Some(kind) = a.aggregate {
        attrs.push(("aggregate", kind.platform_name().to_string()));
    }
    if a.group_by {
        attrs.push(("groupby", "true".to_string()));
    }
    if a.distinct {
        attrs.push(("distinct", "true".to_string()));
    }
    open_tag(out, depth, "attribute", &attrs, true);
}

fn write_order(out: &mut String, depth: usize, s: &SortSpec) {
    let mut attrs = match &s.target {
        SortTarget::Attribute(name) => vec![("attribute", name.clone())],
        SortTarget::Alias(alias) => vec![("alias", alias.clone())],
    };
    if s.descending {
        attrs.push(("descending", "true".to_string()));
    }
    open_tag(out, depth, "order", &attrs, true);
}

fn write_filter(out: &mut String, depth: usize, f: &FilterNode) {
    match f {
        FilterNode::Condition(c) => {
            // a bare condition still needs a filter element around it
            open_tag(out, depth, "filter", &[("type", "and".to_string())], false);
            write_condition(out, depth + 1, c);
            close_tag(out, depth, "filter");
        }
        FilterNode::Group { op, children } => {
            open_tag(out, depth, "filter", &[("type", op.token().to_string())], false);
            for child in children {
                match child {
                    FilterNode::Condition(c) => write_condition(out, depth + 1, c),
                    FilterNode::Group { .. } => write_filter(out, depth + 1, child),
                }
            }
            close_tag(out, depth, "filter");
        }
    }
}

fn write_condition(out: &mut String, depth: usize, c: &Condition) {
    let mut attrs = Vec::new();
    if let Some(entity) = &c.entity {
        attrs.push(("entityname", entity.clone()));
    }
    attrs.push(("attribute", c.attribute.clone()));
    attrs.push(("operator", c.operator.token().to_string()));
    match &c.value {
        ConditionValue::None => open_tag(out, depth, "condition", &attrs, true),
        ConditionValue::Single(v) => {
            attrs.push(("value", v.clone()));
            open_tag(out, depth, "condition", &attrs, true);
        }
        ConditionValue::List(values) => {
            open_tag(out, depth, "condition", &attrs, false);
            for v in values {
                let _ = writeln!(out, "{}<value>{}</value>", indent(depth + 1), escape(v));
            }
            close_tag(out, depth, "condition");
        }
    }
}

fn open_tag(out: &mut String, depth: usize, name: &str, attrs: &[(&str, String)], self_closing: bool) {
    let _ = write!(out, "{}<{}", indent(depth), name);
    for (key, value) in attrs {
        let _ = write!(out, " {}=\"{}\"", key, escape(value));
    }
    let _ = writeln!(out, "{}>", if self_closing { " /" } else { "" });
}

fn close_tag(out: &mut String, depth: usize, name: &str) {
    let _ = writeln!(out, "{}</{}>", indent(depth), name);
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::query::*;

    #[test]
    fn renders_nested_document() {
        let mut q = FetchQuery::new("account");
        q.top = Some(10);
        q.entity.push(FetchItem::Attribute(FetchAttribute::new("name", None)));
        q.entity.push(FetchItem::Filter(FilterNode::and(vec![
            FilterNode::Condition(Condition::new(None, "name", ConditionOperator::Like, ConditionValue::Single("A&B%".into()))),
            FilterNode::or(vec![
                FilterNode::Condition(Condition::new(Some("c"), "statecode", ConditionOperator::In,
                    ConditionValue::List(vec!["0".into(), "1".into()]))),
                FilterNode::Condition(Condition::new(None, "createdon", ConditionOperator::Named("today".into()), ConditionValue::None)),
            ]),
        ])));
        let mut link = FetchLink::new("contact", "c", "parentcustomerid", "accountid", LinkType::Outer);
        link.push(FetchItem::Attribute(FetchAttribute::new("fullname", None)));
        q.entity.push(FetchItem::Link(link));
        q.entity.push(FetchItem::Order(SortSpec::attribute("name", true)));

        let expected = r#"<fetch top="10">
  <entity name="account">
    <attribute name="name" />
    <filter type="and">
      <condition attribute="name" operator="like" value="A&amp;B%" />
      <filter type="or">
        <condition entityname="c" attribute="statecode" operator="in">
          <value>0</value>
          <value>1</value>
        </condition>
        <condition attribute="createdon" operator="today" />
      </filter>
    </filter>
    <link-entity name="contact" from="parentcustomerid" to="accountid" alias="c" link-type="outer">
      <attribute name="fullname" />
    </link-entity>
    <order attribute="name" descending="true" />
  </entity>
</fetch>
"#;
        assert_eq!(q.to_fetch_xml(), expected);
    }

    #[test]
    fn renders_aggregate_attributes() {
        let mut q = FetchQuery::new("account");
        q.aggregate = true;
        q.entity.push(FetchItem::Attribute(FetchAttribute::group_key("industrycode", "industry")));
        q.entity.push(FetchItem::Attribute(FetchAttribute::aggregate("name", "names", AggregateKind::CountColumnDistinct)));
        q.entity.push(FetchItem::Order(SortSpec::alias("names", false)));

        let xml = q.to_fetch_xml();
        assert!(xml.starts_with("<fetch aggregate=\"true\">"));
        assert!(xml.contains(r#"<attribute name="industrycode" alias="industry" groupby="true" />"#));
        assert!(xml.contains(r#"<attribute name="name" alias="names" aggregate="countcolumn" distinct="true" />"#));
        assert!(xml.contains(r#"<order alias="names" />"#));
    }
}
