use std::cmp::Ordering;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::aggregation::{Accumulator, AggregateError, single, to_decimal};
use crate::coercion::decimal_to_json;

enum Mode { Min, Max }

/// Numbers compare in the decimal domain; strings (ISO datetimes) compare
/// as text.
#[derive(Debug, Clone, PartialEq)]
enum Extremum {
    Number(Decimal),
    Text(String),
}

pub struct ExtremaAcc {
    mode: Mode,
    current: Option<Extremum>,
}

impl ExtremaAcc {
    pub fn new_min() -> Self { Self { mode: Mode::Min, current: None } }
    pub fn new_max() -> Self { Self { mode: Mode::Max, current: None } }

    fn name(&self) -> &'static str {
        match self.mode {
            Mode::Min => "MIN",
            Mode::Max => "MAX",
        }
    }

    fn read(&self, v: &Value) -> Result<Extremum, AggregateError> {
        match v {
            Value::Number(_) => to_decimal(self.name(), v).map(Extremum::Number),
            Value::String(s) => Ok(Extremum::Text(s.clone())),
            other => Err(AggregateError::NotNumeric { function: self.name(), value: other.to_string() }),
        }
    }

    fn better(&self, cur: &Extremum, candidate: &Extremum) -> Result<bool, AggregateError> {
        let ord = match (cur, candidate) {
            (Extremum::Number(a), Extremum::Number(b)) => a.cmp(b),
            (Extremum::Text(a), Extremum::Text(b)) => a.cmp(b),
            _ => return Err(AggregateError::MixedTypes { function: self.name() }),
        };
        Ok(match self.mode {
            Mode::Min => ord == Ordering::Greater,
            Mode::Max => ord == Ordering::Less,
        })
    }
}

impl Accumulator for ExtremaAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError> {
        let v = single(self.name(), args)?;
        if v.is_null() {
            return Ok(());
        }
        let candidate = self.read(v)?;
        match &self.current {
            None => self.current = Some(candidate),
            Some(cur) => {
                if self.better(cur, &candidate)? {
                    self.current = Some(candidate);
                }
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        match &self.current {
            None => Value::Null,
            Some(Extremum::Number(d)) => decimal_to_json(d),
            Some(Extremum::Text(s)) => Value::String(s.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn run(mut acc: ExtremaAcc, values: Vec<Value>) -> Result<Value, AggregateError> {
        for v in values {
            acc.update(&[v])?;
        }
        Ok(acc.finalize())
    }

    #[test]
    fn min_and_max_skip_nulls() {
        let values = vec![json!(5), Value::Null, json!(-2.5), json!(9)];
        assert_eq!(run(ExtremaAcc::new_min(), values.clone()).unwrap(), json!(-2.5));
        assert_eq!(run(ExtremaAcc::new_max(), values).unwrap(), json!(9));
    }

    #[test]
    fn datetimes_compare_as_iso_text() {
        let values = vec![json!("2024-03-01T10:00:00"), json!("2023-12-31T23:59:59")];
        assert_eq!(run(ExtremaAcc::new_min(), values).unwrap(), json!("2023-12-31T23:59:59"));
    }

    #[test]
    fn mixed_types_fail() {
        let err = run(ExtremaAcc::new_max(), vec![json!(1), json!("x")]).unwrap_err();
        assert_eq!(err, AggregateError::MixedTypes { function: "MAX" });
        assert_eq!(run(ExtremaAcc::new_max(), vec![]).unwrap(), Value::Null);
    }
}
