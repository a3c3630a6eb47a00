use rust_decimal::Decimal;
use serde_json::Value;

use crate::aggregation::{Accumulator, AggregateError, single, to_decimal};
use crate::coercion::decimal_to_json;

/// Running sum over running non-null count.
pub struct AvgAcc {
    sum: Decimal,
    cnt: i64,
}

impl AvgAcc {
    pub fn new() -> Self { Self { sum: Decimal::ZERO, cnt: 0 } }
}

impl Default for AvgAcc {
    fn default() -> Self { Self::new() }
}

impl Accumulator for AvgAcc {
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError> {
        let v = single("AVG", args)?;
        if v.is_null() {
            return Ok(());
        }
        let d = to_decimal("AVG", v)?;
        self.sum = self.sum.checked_add(d).ok_or(AggregateError::Overflow { function: "AVG" })?;
        self.cnt += 1;
        Ok(())
    }

    fn finalize(&self) -> Value {
        if self.cnt == 0 {
            return Value::Null;
        }
        self.sum
            .checked_div(Decimal::from(self.cnt))
            .map(|avg| decimal_to_json(&avg))
            .unwrap_or(Value::Null)
    }
}
