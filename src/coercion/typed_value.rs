use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A literal converted to the platform type of its target attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Null,
    Integer(i32),
    BigInt(i64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Decimal(Decimal),
    Double(f64),
    String(String),
    Money(Decimal),
    OptionSet(i32),
    EntityReference { entity: String, id: Uuid },
    Guid(Uuid),
}

impl TypedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, TypedValue::Null)
    }

    /// Plain JSON form used in rows: references collapse to their id,
    /// decimals to JSON numbers.
    pub fn to_json(&self) -> Value {
        match self {
            TypedValue::Null => Value::Null,
            TypedValue::Integer(i) | TypedValue::OptionSet(i) => json!(i),
            TypedValue::BigInt(i) => json!(i),
            TypedValue::Boolean(b) => json!(b),
            TypedValue::DateTime(dt) => json!(dt.format(DATETIME_FORMAT).to_string()),
            TypedValue::Decimal(d) | TypedValue::Money(d) => decimal_to_json(d),
            TypedValue::Double(f) => json!(f),
            TypedValue::String(s) => json!(s),
            TypedValue::EntityReference { id, .. } | TypedValue::Guid(id) => json!(id.to_string()),
        }
    }
}

/// Whole decimals become JSON integers, the rest JSON floats.
pub fn decimal_to_json(d: &Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return json!(i);
        }
    }
    d.to_f64().map(|f| json!(f)).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn json_form_flattens_references() {
        let id = Uuid::new_v4();
        let r = TypedValue::EntityReference { entity: "account".into(), id };
        assert_eq!(r.to_json(), json!(id.to_string()));
        assert_eq!(TypedValue::Money(Decimal::from_str("12.50").unwrap()).to_json(), json!(12.5));
        assert_eq!(TypedValue::Decimal(Decimal::from_str("3.00").unwrap()).to_json(), json!(3));
        assert_eq!(TypedValue::Null.to_json(), Value::Null);
    }

    #[test]
    fn serializes_with_type_tag() {
        let v = serde_json::to_value(TypedValue::OptionSet(3)).unwrap();
        assert_eq!(v, json!({"type": "optionset", "value": 3}));
    }
}
