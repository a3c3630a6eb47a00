use rust_decimal::Decimal;
use serde_json::Value;

use crate::aggregation::{Accumulator, AggregateError, single, to_decimal};
use crate::coercion::decimal_to_json;

pub struct SumAcc {
    sum: Decimal,
    seen: bool,
}

impl SumAcc {
    pub fn new() -> Self { Self { sum: Decimal::ZERO, seen: false } }
}

impl Default for SumAcc {
    fn default() -> Self { Self::new() }
}

impl Accumulator for SumAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError> {
        let v = single("SUM", args)?;
        if v.is_null() {
            return Ok(());
        }
        let d = to_decimal("SUM", v)?;
        self.sum = self.sum.checked_add(d).ok_or(AggregateError::Overflow { function: "SUM" })?;
        self.seen = true;
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.seen { decimal_to_json(&self.sum) } else { Value::Null }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sums_in_decimal_without_float_drift() {
        let mut acc = SumAcc::new();
        for v in [json!(0.1), json!(0.2), Value::Null] {
            acc.update(&[v]).unwrap();
        }
        assert_eq!(acc.finalize(), json!(0.3));
    }

    #[test]
    fn empty_sum_is_null_and_text_is_rejected() {
        let mut acc = SumAcc::new();
        assert_eq!(acc.finalize(), Value::Null);
        assert!(matches!(acc.update(&[json!("abc")]), Err(AggregateError::NotNumeric { .. })));
        acc.update(&[json!("12.50")]).unwrap();
        assert_eq!(acc.finalize(), json!(12.5));
    }
}
