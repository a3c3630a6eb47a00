use std::collections::HashMap;

use once_cell::sync::Lazy;
use uuid::Uuid;

use crate::ast::{Literal, Span};
use crate::coercion::{CoercionError, DATETIME_FORMAT, TypedValue, ValueCoercion};
use crate::compiler::{CompileError, ResolvedColumn};
use crate::metadata::AttributeType;

/// SQL function name -> platform condition operator.
static NAMED_OPERATORS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("today", "today"),
        ("yesterday", "yesterday"),
        ("tomorrow", "tomorrow"),
        ("lastxdays", "last-x-days"),
        ("nextxdays", "next-x-days"),
        ("lastxhours", "last-x-hours"),
        ("nextxhours", "next-x-hours"),
        ("lastxmonths", "last-x-months"),
        ("nextxmonths", "next-x-months"),
        ("lastxyears", "last-x-years"),
        ("nextxyears", "next-x-years"),
        ("thismonth", "this-month"),
        ("thisyear", "this-year"),
        ("lastmonth", "last-month"),
        ("lastyear", "last-year"),
        ("nextmonth", "next-month"),
        ("nextyear", "next-year"),
        ("olderthanxdays", "olderthan-x-days"),
        ("olderthanxmonths", "olderthan-x-months"),
        ("eqbusinessid", "eq-businessid"),
        ("equserid", "eq-userid"),
        ("neuserid", "ne-userid"),
        ("under", "under"),
        ("eqorunder", "eq-or-under"),
        ("above", "above"),
        ("eqorabove", "eq-or-above"),
        ("on", "on"),
        ("onorafter", "on-or-after"),
        ("onorbefore", "on-or-before"),
    ])
});

pub struct LiteralResolver;

impl LiteralResolver {
    pub fn named_operator(function: &str) -> Option<&'static str> {
        NAMED_OPERATORS.get(function.to_ascii_lowercase().as_str()).copied()
    }

    /// Text of a literal compared against `column`, normalised to the form the
    /// platform expects for the attribute type.
    pub fn condition_text(column: &ResolvedColumn, literal: &Literal, span: Span) -> Result<String, CompileError> {
        let Some(text) = literal.to_value_string() else {
            return CompileError::unsupported("comparison with NULL never matches; use IS NULL or IS NOT NULL", span).err();
        };
        let attribute = &column.attribute;
        match attribute.attribute_type {
            AttributeType::String | AttributeType::Memo | AttributeType::Virtual => Ok(text),
            // filtering on polymorphic lookups is fine, only the id has to parse
            AttributeType::Lookup | AttributeType::Customer | AttributeType::Owner | AttributeType::UniqueIdentifier => {
                Uuid::parse_str(text.trim())
                    .map(|id| id.to_string())
                    .map_err(|_| CompileError::from_coercion(
                        CoercionError::invalid(&attribute.logical_name, &text, "record id"),
                        span,
                    ))
            }
            _ => ValueCoercion::coerce(attribute, &text)
                .map(|v| Self::render(&v))
                .map_err(|e| CompileError::from_coercion(e, span)),
        }
    }

    fn render(value: &TypedValue) -> String {
        match value {
            TypedValue::Null => String::new(),
            TypedValue::Integer(i) | TypedValue::OptionSet(i) => i.to_string(),
            TypedValue::BigInt(i) => i.to_string(),
            TypedValue::Boolean(b) => if *b { "1".to_string() } else { "0".to_string() },
            TypedValue::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
            TypedValue::Decimal(d) | TypedValue::Money(d) => d.normalize().to_string(),
            TypedValue::Double(f) => f.to_string(),
            TypedValue::String(s) => s.clone(),
            TypedValue::EntityReference { id, .. } | TypedValue::Guid(id) => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_operators_use_platform_tokens() {
        assert_eq!(LiteralResolver::named_operator("LastXDays"), Some("last-x-days"));
        assert_eq!(LiteralResolver::named_operator("eqorabove"), Some("eq-or-above"));
        assert_eq!(LiteralResolver::named_operator("upper"), None);
    }
}
