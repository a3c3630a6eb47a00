use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::coercion::DATETIME_FORMAT;
use crate::executor::ConnectorFault;
use crate::memory::Truth;
use crate::query::{Condition, ConditionOperator, ConditionValue, FilterNode, LogicalOp};

/// Filter evaluation over one flattened record (`attribute` and `alias.attribute` keys).
pub struct Eval;

impl Eval {
    pub fn eval_filter(node: &FilterNode, row: &Map<String, Value>) -> Result<Truth, ConnectorFault> {
        match node {
            FilterNode::Group { op: LogicalOp::And, children } => {
                children.iter().try_fold(Truth::True, |acc, c| Ok(acc & Self::eval_filter(c, row)?))
            }
            FilterNode::Group { op: LogicalOp::Or, children } => {
                if children.is_empty() {
                    return Ok(Truth::True);
                }
                children.iter().try_fold(Truth::False, |acc, c| Ok(acc | Self::eval_filter(c, row)?))
            }
            FilterNode::Condition(c) => Self::eval_condition(c, row),
        }
    }

    fn eval_condition(c: &Condition, row: &Map<String, Value>) -> Result<Truth, ConnectorFault> {
        let v = row.get(&c.row_key()).cloned().unwrap_or(Value::Null);
        let single = match &c.value {
            ConditionValue::Single(s) => Some(s.as_str()),
            _ => None,
        };
        let t = match (&c.operator, single) {
            (ConditionOperator::Null, _) => Truth::from(v.is_null()),
            (ConditionOperator::NotNull, _) => Truth::from(!v.is_null()),
            (ConditionOperator::Eq, Some(r)) => Self::cmp3(&v, r, |o| o == Ordering::Equal),
            (ConditionOperator::Ne, Some(r)) => Self::cmp3(&v, r, |o| o != Ordering::Equal),
            (ConditionOperator::Gt, Some(r)) => Self::cmp3(&v, r, |o| o == Ordering::Greater),
            (ConditionOperator::Ge, Some(r)) => Self::cmp3(&v, r, |o| o != Ordering::Less),
            (ConditionOperator::Lt, Some(r)) => Self::cmp3(&v, r, |o| o == Ordering::Less),
            (ConditionOperator::Le, Some(r)) => Self::cmp3(&v, r, |o| o != Ordering::Greater),
            (ConditionOperator::Like, Some(p)) => Self::like3(&v, p),
            (ConditionOperator::NotLike, Some(p)) => !Self::like3(&v, p),
            (ConditionOperator::In | ConditionOperator::NotIn, _) => {
                let list = match &c.value {
                    ConditionValue::List(items) => items.as_slice(),
                    ConditionValue::Single(s) => std::slice::from_ref(s),
                    ConditionValue::None => &[],
                };
                let found = list.iter().fold(Truth::False, |acc, r| acc | Self::cmp3(&v, r, |o| o == Ordering::Equal));
                if c.operator == ConditionOperator::NotIn { !found } else { found }
            }
            (ConditionOperator::Named(token), _) => Self::eval_named(token, &v, single)?,
            (op, None) => {
                return Err(ConnectorFault::new(format!("operator {} on {} needs a value", op.token(), c.attribute)))
            }
        };
        Ok(t)
    }

    /// Compares a stored value with the text form of a condition value,
    /// reading the text as the stored value's type.
    fn cmp3(v: &Value, text: &str, accept: impl Fn(Ordering) -> bool) -> Truth {
        let ord = match v {
            Value::Null => return Truth::Unknown,
            Value::Number(n) => {
                let stored = Decimal::from_str(&n.to_string()).ok();
                match (stored, Decimal::from_str(text.trim()).ok()) {
                    (Some(a), Some(b)) => a.cmp(&b),
                    _ => return Truth::False,
                }
            }
            Value::Bool(b) => match text {
                "1" | "true" => b.cmp(&true),
                "0" | "false" => b.cmp(&false),
                _ => return Truth::False,
            },
            Value::String(s) => s.to_lowercase().cmp(&text.to_lowercase()),
            Value::Array(_) | Value::Object(_) => return Truth::Unknown,
        };
        Truth::from(accept(ord))
    }

    fn like3(v: &Value, pattern: &str) -> Truth {
        match v {
            Value::String(s) => Truth::from(Self::eval_like(s, pattern)),
            _ => Truth::Unknown,
        }
    }

    /// `%` and `_` wildcards, `[...]` character sets, case-insensitive.
    pub fn eval_like(value: &str, pattern: &str) -> bool {
        let mut re = String::from("(?is)^");
        let mut in_set = false;
        for ch in pattern.chars() {
            match ch {
                '[' if !in_set => { in_set = true; re.push('['); }
                ']' if in_set => { in_set = false; re.push(']'); }
                '%' if !in_set => re.push_str(".*"),
                '_' if !in_set => re.push('.'),
                c if in_set => {
                    if c == '\\' { re.push('\\'); }
                    re.push(c);
                }
                c => re.push_str(&regex::escape(&c.to_string())),
            }
        }
        if in_set {
            return false;
        }
        re.push('$');
        regex::Regex::new(&re).map(|r| r.is_match(value)).unwrap_or(false)
    }

    fn eval_named(token: &str, v: &Value, arg: Option<&str>) -> Result<Truth, ConnectorFault> {
        let Some(stored) = v.as_str().and_then(Self::parse_datetime) else {
            return Ok(Truth::Unknown);
        };
        let now = Utc::now().naive_utc();
        let today = now.date();
        let n = || -> Result<i64, ConnectorFault> {
            arg.and_then(|a| a.trim().parse::<i64>().ok())
                .ok_or_else(|| ConnectorFault::new(format!("operator {} needs a whole number", token)))
        };
        let date_arg = || -> Result<NaiveDate, ConnectorFault> {
            arg.and_then(Self::parse_datetime)
                .map(|d| d.date())
                .ok_or_else(|| ConnectorFault::new(format!("operator {} needs a date", token)))
        };
        let t = match token {
            "today" => stored.date() == today,
            "yesterday" => stored.date() == today - Duration::days(1),
            "tomorrow" => stored.date() == today + Duration::days(1),
            "last-x-days" => stored >= now - Duration::days(n()?) && stored <= now,
            "next-x-days" => stored >= now && stored <= now + Duration::days(n()?),
            "last-x-hours" => stored >= now - Duration::hours(n()?) && stored <= now,
            "next-x-hours" => stored >= now && stored <= now + Duration::hours(n()?),
            "olderthan-x-days" => stored < now - Duration::days(n()?),
            "this-year" => stored.date().format("%Y").to_string() == today.format("%Y").to_string(),
            "this-month" => stored.date().format("%Y-%m").to_string() == today.format("%Y-%m").to_string(),
            "on" => stored.date() == date_arg()?,
            "on-or-after" => stored.date() >= date_arg()?,
            "on-or-before" => stored.date() <= date_arg()?,
            other => return Err(ConnectorFault::new(format!("operator {} is not supported in memory", other))),
        };
        Ok(Truth::from(t))
    }

    fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
            .ok()
            .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => Map::new(),
        }
    }

    fn cond(attr: &str, op: ConditionOperator, value: ConditionValue) -> FilterNode {
        FilterNode::Condition(Condition::new(None, attr, op, value))
    }

    fn single(s: &str) -> ConditionValue {
        ConditionValue::Single(s.into())
    }

    #[test]
    fn comparisons_follow_the_stored_type() {
        let r = row(json!({"n": 12, "s": "Contoso", "b": true}));
        let t = |f: FilterNode| Eval::eval_filter(&f, &r).unwrap();
        assert_eq!(t(cond("n", ConditionOperator::Gt, single("9.5"))), Truth::True);
        assert_eq!(t(cond("n", ConditionOperator::Eq, single("12.0"))), Truth::True);
        assert_eq!(t(cond("s", ConditionOperator::Eq, single("contoso"))), Truth::True);
        assert_eq!(t(cond("b", ConditionOperator::Eq, single("1"))), Truth::True);
        assert_eq!(t(cond("missing", ConditionOperator::Eq, single("1"))), Truth::Unknown);
        assert_eq!(t(cond("missing", ConditionOperator::Null, ConditionValue::None)), Truth::True);
    }

    #[test]
    fn in_lists_and_groups() {
        let r = row(json!({"code": 2, "name": null}));
        let f = FilterNode::or(vec![
            cond("name", ConditionOperator::Eq, single("x")),
            cond("code", ConditionOperator::In, ConditionValue::List(vec!["1".into(), "2".into()])),
        ]);
        assert_eq!(Eval::eval_filter(&f, &r).unwrap(), Truth::True);
        let g = FilterNode::and(vec![cond("name", ConditionOperator::Eq, single("x")), cond("code", ConditionOperator::Eq, single("2"))]);
        assert_eq!(Eval::eval_filter(&g, &r).unwrap(), Truth::Unknown);
    }

    #[test]
    fn like_supports_wildcards_and_sets() {
        assert!(Eval::eval_like("Contoso Ltd", "con%"));
        assert!(Eval::eval_like("a.b", "a_b"));
        assert!(!Eval::eval_like("axb", "a.b"));
        assert!(Eval::eval_like("B1", "[ab]_"));
        assert!(!Eval::eval_like("c1", "[ab]_"));
    }

    #[test]
    fn named_date_operators() {
        let recent = (Utc::now().naive_utc() - Duration::days(2)).format(DATETIME_FORMAT).to_string();
        let r = row(json!({"createdon": recent, "other": "2001-01-01T00:00:00"}));
        let named = |attr: &str, op: &str, v: ConditionValue| {
            Eval::eval_filter(&cond(attr, ConditionOperator::Named(op.into()), v), &r)
        };
        assert_eq!(named("createdon", "last-x-days", single("7")).unwrap(), Truth::True);
        assert_eq!(named("other", "last-x-days", single("7")).unwrap(), Truth::False);
        assert_eq!(named("other", "on", single("2001-01-01")).unwrap(), Truth::True);
        assert!(named("other", "eq-userid", ConditionValue::None).is_err());
    }
}
