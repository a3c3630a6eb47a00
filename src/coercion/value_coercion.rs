use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use uuid::Uuid;

use crate::ast::Literal;
use crate::coercion::{CoercionError, TypedValue};
use crate::metadata::{AttributeMetadata, AttributeType};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

pub struct ValueCoercion;

impl ValueCoercion {
    /// Convert the text form of a literal to the declared type of `attribute`.
    pub fn coerce(attribute: &AttributeMetadata, text: &str) -> Result<TypedValue, CoercionError> {
        let name = attribute.logical_name.as_str();
        match attribute.attribute_type {
            AttributeType::Integer => text.trim().parse::<i32>()
                .map(TypedValue::Integer)
                .map_err(|_| CoercionError::invalid(name, text, "integer")),
            AttributeType::BigInt => text.trim().parse::<i64>()
                .map(TypedValue::BigInt)
                .map_err(|_| CoercionError::invalid(name, text, "bigint")),
            AttributeType::Boolean => match text.trim() {
                "1" => Ok(TypedValue::Boolean(true)),
                "0" => Ok(TypedValue::Boolean(false)),
                _ => Err(CoercionError::invalid(name, text, "boolean (0 or 1)")),
            },
            AttributeType::DateTime => Self::parse_datetime(text)
                .map(TypedValue::DateTime)
                .ok_or_else(|| CoercionError::invalid(name, text, "datetime")),
            AttributeType::Decimal => Self::parse_decimal(text)
                .map(TypedValue::Decimal)
                .ok_or_else(|| CoercionError::invalid(name, text, "decimal")),
            AttributeType::Money => Self::parse_decimal(text)
                .map(TypedValue::Money)
                .ok_or_else(|| CoercionError::invalid(name, text, "money")),
            AttributeType::Double => match text.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(TypedValue::Double(f)),
                _ => Err(CoercionError::invalid(name, text, "double")),
            },
            AttributeType::String | AttributeType::Memo => Ok(TypedValue::String(text.to_string())),
            AttributeType::Picklist | AttributeType::State | AttributeType::Status => {
                if let Ok(code) = text.trim().parse::<i32>() {
                    return Ok(TypedValue::OptionSet(code));
                }
                attribute.option_by_label(text.trim())
                    .map(|o| TypedValue::OptionSet(o.value))
                    .ok_or_else(|| CoercionError::invalid(name, text, "option value"))
            }
            AttributeType::Lookup | AttributeType::Customer | AttributeType::Owner => {
                let [target] = attribute.lookup_targets.as_slice() else {
                    return Err(CoercionError::unsupported(
                        name,
                        format!("lookup targets {} entity types; only single-target lookups can be set", attribute.lookup_targets.len()),
                    ));
                };
                Uuid::parse_str(text.trim())
                    .map(|id| TypedValue::EntityReference { entity: target.clone(), id })
                    .map_err(|_| CoercionError::invalid(name, text, "record id"))
            }
            AttributeType::UniqueIdentifier => Uuid::parse_str(text.trim())
                .map(TypedValue::Guid)
                .map_err(|_| CoercionError::invalid(name, text, "uniqueidentifier")),
            AttributeType::Virtual => Err(CoercionError::unsupported(name, "virtual attributes have no literal form")),
        }
    }

    /// NULL maps to [`TypedValue::Null`]; everything else goes through [`coerce`](Self::coerce).
    pub fn coerce_literal(attribute: &AttributeMetadata, literal: &Literal) -> Result<TypedValue, CoercionError> {
        match literal.to_value_string() {
            Some(text) => Self::coerce(attribute, &text),
            None => Ok(TypedValue::Null),
        }
    }

    /// Coerce a value read from a retrieved row, as INSERT ... SELECT does at run time.
    pub fn coerce_json(attribute: &AttributeMetadata, value: &Value) -> Result<TypedValue, CoercionError> {
        match value {
            Value::Null => Ok(TypedValue::Null),
            Value::String(s) => Self::coerce(attribute, s),
            Value::Number(n) => Self::coerce(attribute, &n.to_string()),
            Value::Bool(b) => Self::coerce(attribute, if *b { "1" } else { "0" }),
            Value::Array(_) | Value::Object(_) => {
                Err(CoercionError::invalid(&attribute.logical_name, &value.to_string(), "scalar value"))
            }
        }
    }

    fn parse_decimal(text: &str) -> Option<Decimal> {
        let text = text.trim();
        Decimal::from_str(text).ok().or_else(|| Decimal::from_scientific(text).ok())
    }

    fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(dt.naive_utc());
        }
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::AttributeMetadata;
    use serde_json::json;

    fn attr(t: AttributeType) -> AttributeMetadata {
        AttributeMetadata::new("field", t)
    }

    #[test]
    fn integers_and_booleans() {
        assert_eq!(ValueCoercion::coerce(&attr(AttributeType::Integer), "42"), Ok(TypedValue::Integer(42)));
        assert_eq!(ValueCoercion::coerce(&attr(AttributeType::BigInt), "9000000000"), Ok(TypedValue::BigInt(9_000_000_000)));
        assert!(matches!(
            ValueCoercion::coerce(&attr(AttributeType::Integer), "4x"),
            Err(CoercionError::Invalid { expected: "integer", .. })
        ));
        assert_eq!(ValueCoercion::coerce(&attr(AttributeType::Boolean), "1"), Ok(TypedValue::Boolean(true)));
        assert_eq!(ValueCoercion::coerce(&attr(AttributeType::Boolean), "0"), Ok(TypedValue::Boolean(false)));
        assert!(ValueCoercion::coerce(&attr(AttributeType::Boolean), "true").is_err());
    }

    #[test]
    fn datetimes_accept_common_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(13, 30, 0).unwrap();
        for text in ["2024-03-01 13:30:00", "2024-03-01T13:30:00", "2024-03-01T13:30:00Z", "2024-03-01 13:30"] {
            assert_eq!(ValueCoercion::coerce(&attr(AttributeType::DateTime), text), Ok(TypedValue::DateTime(expected)), "{text}");
        }
        let midnight = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(ValueCoercion::coerce(&attr(AttributeType::DateTime), "2024-03-01"), Ok(TypedValue::DateTime(midnight)));
        assert!(ValueCoercion::coerce(&attr(AttributeType::DateTime), "March 1st").is_err());
    }

    #[test]
    fn money_wraps_a_decimal() {
        let v = ValueCoercion::coerce(&attr(AttributeType::Money), "19.99").unwrap();
        assert_eq!(v, TypedValue::Money(Decimal::from_str("19.99").unwrap()));
        assert_eq!(
            ValueCoercion::coerce(&attr(AttributeType::Decimal), "1e3"),
            Ok(TypedValue::Decimal(Decimal::from(1000)))
        );
        assert!(ValueCoercion::coerce(&attr(AttributeType::Double), "NaN").is_err());
    }

    #[test]
    fn option_sets_take_codes_or_labels() {
        let industry = AttributeMetadata::picklist("industrycode", &[(1, "Accounting"), (2, "Retail")]);
        assert_eq!(ValueCoercion::coerce(&industry, "2"), Ok(TypedValue::OptionSet(2)));
        assert_eq!(ValueCoercion::coerce(&industry, "retail"), Ok(TypedValue::OptionSet(2)));
        assert!(ValueCoercion::coerce(&industry, "Mining").is_err());
    }

    #[test]
    fn lookups_require_a_single_target() {
        let id = Uuid::new_v4();
        let parent = AttributeMetadata::lookup("parentaccountid", &["account"]);
        assert_eq!(
            ValueCoercion::coerce(&parent, &id.to_string()),
            Ok(TypedValue::EntityReference { entity: "account".into(), id })
        );

        let customer = AttributeMetadata::lookup("customerid", &["account", "contact"]);
        assert!(matches!(
            ValueCoercion::coerce(&customer, &id.to_string()),
            Err(CoercionError::Unsupported { .. })
        ));
        assert!(matches!(
            ValueCoercion::coerce(&parent, "not-a-guid"),
            Err(CoercionError::Invalid { .. })
        ));
    }

    #[test]
    fn null_literals_and_json_values() {
        assert_eq!(ValueCoercion::coerce_literal(&attr(AttributeType::Integer), &Literal::Null), Ok(TypedValue::Null));
        assert_eq!(ValueCoercion::coerce_literal(&attr(AttributeType::Boolean), &Literal::Bool(true)), Ok(TypedValue::Boolean(true)));
        assert_eq!(ValueCoercion::coerce_json(&attr(AttributeType::Integer), &json!(7)), Ok(TypedValue::Integer(7)));
        assert_eq!(ValueCoercion::coerce_json(&attr(AttributeType::String), &json!("x")), Ok(TypedValue::String("x".into())));
        assert!(ValueCoercion::coerce_json(&attr(AttributeType::String), &json!({"a": 1})).is_err());
    }

    #[test]
    fn virtual_attributes_are_unsupported() {
        assert!(matches!(
            ValueCoercion::coerce(&attr(AttributeType::Virtual), "x"),
            Err(CoercionError::Unsupported { .. })
        ));
    }
}
