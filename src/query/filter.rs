use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn token(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    NotLike,
    In,
    NotIn,
    Null,
    NotNull,
    /// Platform operator evaluated server side, e.g. `last-x-days`.
    Named(String),
}

impl ConditionOperator {
    pub fn token(&self) -> &str {
        match self {
            ConditionOperator::Eq => "eq",
            ConditionOperator::Ne => "ne",
            ConditionOperator::Gt => "gt",
            ConditionOperator::Ge => "ge",
            ConditionOperator::Lt => "lt",
            ConditionOperator::Le => "le",
            ConditionOperator::Like => "like",
            ConditionOperator::NotLike => "not-like",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not-in",
            ConditionOperator::Null => "null",
            ConditionOperator::NotNull => "not-null",
            ConditionOperator::Named(token) => token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionValue {
    None,
    Single(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// Alias of the link the attribute belongs to; `None` for the root entity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    pub attribute: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
}

impl Condition {
    pub fn new(entity: Option<&str>, attribute: &str, operator: ConditionOperator, value: ConditionValue) -> Self {
        Self {
            entity: entity.map(str::to_string),
            attribute: attribute.to_string(),
            operator,
            value,
        }
    }

    /// Key under which the conditioned attribute appears in a retrieved row.
    pub fn row_key(&self) -> String {
        match &self.entity {
            Some(entity) => format!("{}.{}", entity, self.attribute),
            None => self.attribute.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterNode {
    Condition(Condition),
    Group { op: LogicalOp, children: Vec<FilterNode> },
}

impl FilterNode {
    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Group { op: LogicalOp::And, children }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Group { op: LogicalOp::Or, children }
    }

    /// Depth-first iteration over every condition in the tree.
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            FilterNode::Condition(c) => out.push(c),
            FilterNode::Group { children, .. } => {
                for child in children {
                    child.collect_conditions(out);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FilterNode::Condition(_) => false,
            FilterNode::Group { children, .. } => children.iter().all(FilterNode::is_empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_are_collected_depth_first() {
        let f = FilterNode::and(vec![
            FilterNode::Condition(Condition::new(None, "a", ConditionOperator::Eq, ConditionValue::Single("1".into()))),
            FilterNode::or(vec![
                FilterNode::Condition(Condition::new(Some("c"), "b", ConditionOperator::Null, ConditionValue::None)),
                FilterNode::Condition(Condition::new(None, "d", ConditionOperator::Named("today".into()), ConditionValue::None)),
            ]),
        ]);
        let attrs: Vec<_> = f.conditions().iter().map(|c| c.row_key()).collect();
        assert_eq!(attrs, vec!["a", "c.b", "d"]);
        assert!(!f.is_empty());
        assert!(FilterNode::and(vec![FilterNode::or(vec![])]).is_empty());
    }

    #[test]
    fn operator_tokens_match_platform_names() {
        assert_eq!(ConditionOperator::NotLike.token(), "not-like");
        assert_eq!(ConditionOperator::NotNull.token(), "not-null");
        assert_eq!(ConditionOperator::Named("last-x-days".into()).token(), "last-x-days");
    }
}
