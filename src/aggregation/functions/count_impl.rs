use std::collections::HashSet;

use serde_json::Value;

use crate::aggregation::{Accumulator, AggregateError, single, to_decimal};

/// `COUNT(*)` and `COUNT(column)`.
pub struct CountAcc {
    cnt: i64,
    is_star: bool,
}

impl CountAcc {
    pub fn star() -> Self { Self { cnt: 0, is_star: true } }
    pub fn column() -> Self { Self { cnt: 0, is_star: false } }
}

impl Accumulator for CountAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError> {
        match args {
            // COUNT(*) gets no args and counts every row
            [] if self.is_star => self.cnt += 1,
            [v] if !self.is_star => {
                if !v.is_null() {
                    self.cnt += 1;
                }
            }
            _ => {
                return Err(AggregateError::ArgumentCount {
                    function: "COUNT",
                    expected: if self.is_star { 0 } else { 1 },
                    got: args.len(),
                })
            }
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::Number(serde_json::Number::from(self.cnt))
    }
}

/// `COUNT(DISTINCT column)`: strings compare case-insensitively,
/// numbers by decimal value, everything else by JSON equality.
pub struct CountDistinctAcc {
    seen: HashSet<String>,
}

impl CountDistinctAcc {
    pub fn new() -> Self { Self { seen: HashSet::new() } }

    fn canonical(v: &Value) -> String {
        match v {
            Value::String(s) => format!("s:{}", s.to_lowercase()),
            Value::Number(_) => match to_decimal("COUNT", v) {
                Ok(d) => format!("n:{}", d.normalize()),
                Err(_) => format!("j:{}", v),
            },
            other => format!("j:{}", other),
        }
    }
}

impl Default for CountDistinctAcc {
    fn default() -> Self { Self::new() }
}

impl Accumulator for CountDistinctAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError> {
        let v = single("COUNT", args)?;
        if !v.is_null() {
            self.seen.insert(Self::canonical(v));
        }
        Ok(())
    }

    fn finalize(&self) -> Value {
        Value::Number(serde_json::Number::from(self.seen.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn star_counts_rows_and_column_skips_nulls() {
        let mut star = CountAcc::star();
        let mut col = CountAcc::column();
        for v in [json!(10), Value::Null, json!(20)] {
            star.update(&[]).unwrap();
            col.update(&[v]).unwrap();
        }
        assert_eq!(star.finalize(), json!(3));
        assert_eq!(col.finalize(), json!(2));
    }

    #[test]
    fn column_count_rejects_missing_argument() {
        let mut col = CountAcc::column();
        assert!(matches!(col.update(&[]), Err(AggregateError::ArgumentCount { got: 0, .. })));
    }

    #[test]
    fn distinct_ignores_case_and_numeric_scale() {
        let mut acc = CountDistinctAcc::new();
        for v in [json!("a"), json!("A"), json!("b"), Value::Null] {
            acc.update(&[v]).unwrap();
        }
        assert_eq!(acc.finalize(), json!(2));

        let mut nums = CountDistinctAcc::new();
        for v in [json!(1), json!(1.0), json!(2)] {
            nums.update(&[v]).unwrap();
        }
        assert_eq!(nums.finalize(), json!(2));
    }
}
