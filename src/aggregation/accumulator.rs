use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::aggregation::{AggregateError, AvgAcc, CountAcc, CountDistinctAcc, ExtremaAcc, SumAcc};
use crate::query::AggregateKind;

/// The per-group state.
/// The engine will:
///   1) read the aggregated column of each row into a `serde_json::Value`
///   2) call `update(&mut self, &args)`, with no args for `COUNT(*)`
///   3) after the last row of the group, call `finalize()`
pub trait Accumulator: Send {
    /// Update the running state with this row's value.
    fn update(&mut self, args: &[Value]) -> Result<(), AggregateError>;

    /// Produce the final result as a JSON value.
    fn finalize(&self) -> Value;
}

/// One aggregate output column of a grouped result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSpec {
    /// Output key, also the row key of the input value.
    pub alias: String,
    pub kind: AggregateKind,
}

impl AggregateSpec {
    pub fn new(alias: &str, kind: AggregateKind) -> Self {
        Self { alias: alias.to_string(), kind }
    }

    /// A fresh accumulator in its empty state.
    pub fn accumulator(&self) -> Box<dyn Accumulator> {
        match self.kind {
            AggregateKind::Count => Box::new(CountAcc::star()),
            AggregateKind::CountColumn => Box::new(CountAcc::column()),
            AggregateKind::CountColumnDistinct => Box::new(CountDistinctAcc::new()),
            AggregateKind::Sum => Box::new(SumAcc::new()),
            AggregateKind::Avg => Box::new(AvgAcc::new()),
            AggregateKind::Min => Box::new(ExtremaAcc::new_min()),
            AggregateKind::Max => Box::new(ExtremaAcc::new_max()),
        }
    }

    /// Arguments fed to the accumulator for one row.
    pub fn args_of(&self, value: Option<&Value>) -> Vec<Value> {
        match self.kind {
            AggregateKind::Count => vec![],
            _ => vec![value.cloned().unwrap_or(Value::Null)],
        }
    }
}

/// Reads a JSON value into the decimal domain. Numeric strings are accepted
/// because money and decimal columns can arrive formatted.
pub fn to_decimal(function: &'static str, v: &Value) -> Result<Decimal, AggregateError> {
    let parsed = match v {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => {
                let text = n.to_string();
                Decimal::from_str(&text).or_else(|_| Decimal::from_scientific(&text)).ok()
            }
        },
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    parsed.ok_or_else(|| AggregateError::NotNumeric { function, value: v.to_string() })
}

pub(crate) fn single<'a>(function: &'static str, args: &'a [Value]) -> Result<&'a Value, AggregateError> {
    match args {
        [v] => Ok(v),
        _ => Err(AggregateError::ArgumentCount { function, expected: 1, got: args.len() }),
    }
}
