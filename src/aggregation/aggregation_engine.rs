use std::iter::Fuse;

use serde_json::Value;
use tracing::trace;

use crate::aggregation::{Accumulator, AggregateError, AggregateSpec};
use crate::executor::Row;

pub struct AggregationEngine;

impl AggregationEngine {
    /// Groups `rows`, which must already be sorted by `group_keys`, in one pass.
    ///
    /// A group ends when the key tuple changes; its accumulators are then
    /// finalized into one output row and fresh ones start the next group.
    /// Without group keys the whole input is one group, emitted even when
    /// the input is empty.
    pub fn aggregate<I>(rows: I, group_keys: Vec<String>, specs: Vec<AggregateSpec>) -> GroupedRows<I::IntoIter>
    where
        I: IntoIterator<Item = Row>,
    {
        GroupedRows {
            input: rows.into_iter().fuse(),
            group_keys,
            specs,
            current: None,
            emitted: 0,
            done: false,
        }
    }
}

struct Group {
    key: Vec<Value>,
    accumulators: Vec<Box<dyn Accumulator>>,
}

/// Lazy output of [`AggregationEngine::aggregate`]. Finite and not restartable:
/// after the final group it only returns `None`.
pub struct GroupedRows<I: Iterator<Item = Row>> {
    input: Fuse<I>,
    group_keys: Vec<String>,
    specs: Vec<AggregateSpec>,
    current: Option<Group>,
    emitted: usize,
    done: bool,
}

impl<I: Iterator<Item = Row>> GroupedRows<I> {
    fn key_of(&self, row: &Row) -> Vec<Value> {
        self.group_keys.iter().map(|k| row.value(k)).collect()
    }

    fn start(&self, key: Vec<Value>) -> Group {
        Group { key, accumulators: self.specs.iter().map(AggregateSpec::accumulator).collect() }
    }

    fn feed(specs: &[AggregateSpec], group: &mut Group, row: &Row) -> Result<(), AggregateError> {
        for (spec, acc) in specs.iter().zip(group.accumulators.iter_mut()) {
            acc.update(&spec.args_of(row.get(&spec.alias)))?;
        }
        Ok(())
    }

    fn finish(&mut self, group: Group) -> Row {
        let mut out = Row::new();
        for (key, value) in self.group_keys.iter().zip(group.key) {
            out.insert(key, value);
        }
        for (spec, acc) in self.specs.iter().zip(group.accumulators.iter()) {
            out.insert(&spec.alias, acc.finalize());
        }
        self.emitted += 1;
        trace!(group = self.emitted, "group completed");
        out
    }

    fn fail(&mut self, e: AggregateError) -> Option<Result<Row, AggregateError>> {
        self.done = true;
        self.current = None;
        Some(Err(e))
    }
}

impl<I: Iterator<Item = Row>> Iterator for GroupedRows<I> {
    type Item = Result<Row, AggregateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        while let Some(row) = self.input.next() {
            let key = self.key_of(&row);
            let continues = self.current.as_ref().is_some_and(|g| same_key(&g.key, &key));
            if continues {
                if let Some(group) = self.current.as_mut() {
                    if let Err(e) = Self::feed(&self.specs, group, &row) {
                        return self.fail(e);
                    }
                }
                continue;
            }

            let mut fresh = self.start(key);
            if let Err(e) = Self::feed(&self.specs, &mut fresh, &row) {
                return self.fail(e);
            }
            if let Some(completed) = self.current.replace(fresh) {
                return Some(Ok(self.finish(completed)));
            }
        }

        self.done = true;
        match self.current.take() {
            Some(last) => Some(Ok(self.finish(last))),
            None if self.group_keys.is_empty() && self.emitted == 0 => {
                let empty = self.start(vec![]);
                Some(Ok(self.finish(empty)))
            }
            None => None,
        }
    }
}

/// Key tuples match when every part matches; text ignores case.
fn same_key(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| match (x, y) {
        (Value::String(x), Value::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => x.as_f64() == y.as_f64(),
        },
        _ => x == y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::AggregateKind;
    use serde_json::json;

    fn rows(values: Vec<Value>) -> Vec<Row> {
        values.into_iter().filter_map(Row::from_value).collect()
    }

    #[test]
    fn break_detection_emits_groups_in_input_order() {
        let input = rows(vec![
            json!({"k": "A", "id": 1}),
            json!({"k": "A", "id": 2}),
            json!({"k": "B", "id": 3}),
            json!({"k": "B", "id": 4}),
            json!({"k": "B", "id": 5}),
        ]);
        let out: Vec<_> = AggregationEngine::aggregate(input, vec!["k".into()], vec![AggregateSpec::new("id", AggregateKind::Count)])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!((out[0].value("k"), out[0].value("id")), (json!("A"), json!(2)));
        assert_eq!((out[1].value("k"), out[1].value("id")), (json!("B"), json!(3)));
    }

    fn single_group(input: Vec<Row>, alias: &str, kind: AggregateKind) -> Value {
        let out: Vec<_> = AggregationEngine::aggregate(input, vec![], vec![AggregateSpec::new(alias, kind)])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(out.len(), 1);
        out[0].value(alias)
    }

    #[test]
    fn null_semantics_within_one_group() {
        let input = rows(vec![json!({"v": 10}), json!({"v": null}), json!({"v": 20})]);
        assert_eq!(single_group(input.clone(), "v", AggregateKind::Avg), json!(15));
        assert_eq!(single_group(input.clone(), "v", AggregateKind::CountColumn), json!(2));
        assert_eq!(single_group(input, "v", AggregateKind::Count), json!(3));
    }

    #[test]
    fn count_distinct_ignores_case() {
        let input = rows(vec![json!({"s": "a"}), json!({"s": "A"}), json!({"s": "b"})]);
        assert_eq!(single_group(input, "s", AggregateKind::CountColumnDistinct), json!(2));
    }

    #[test]
    fn empty_input_without_keys_yields_one_empty_group() {
        let specs = vec![AggregateSpec::new("n", AggregateKind::Count), AggregateSpec::new("s", AggregateKind::Sum)];
        let out: Vec<_> = AggregationEngine::aggregate(Vec::new(), vec![], specs).collect::<Result<_, _>>().unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value("n"), json!(0));
        assert_eq!(out[0].value("s"), Value::Null);

        let grouped = AggregationEngine::aggregate(Vec::new(), vec!["k".into()], vec![AggregateSpec::new("n", AggregateKind::Count)]);
        assert_eq!(grouped.count(), 0);
    }

    #[test]
    fn iterator_is_lazy_and_stops_after_error() {
        let input = rows(vec![json!({"k": 1, "v": 1}), json!({"k": 2, "v": "x"}), json!({"k": 3, "v": 3})]);
        let mut it = AggregationEngine::aggregate(input, vec!["k".into()], vec![AggregateSpec::new("v", AggregateKind::Sum)]);
        assert!(matches!(it.next(), Some(Err(AggregateError::NotNumeric { .. }))));
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn text_keys_group_case_insensitively() {
        let input = rows(vec![json!({"k": "Porto"}), json!({"k": "PORTO"}), json!({"k": "Lisboa"})]);
        let out: Vec<_> = AggregationEngine::aggregate(input, vec!["k".into()], vec![AggregateSpec::new("k", AggregateKind::Count)])
            .collect::<Result<_, _>>().unwrap();
        assert_eq!(out.len(), 2);
    }
}
