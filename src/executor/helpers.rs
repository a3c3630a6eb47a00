use std::cmp::Ordering;

use serde_json::Value;

use crate::executor::Row;

pub struct Helpers;

impl Helpers {
    // NULLS LAST comparator (ascending flag); text ignores case first
    pub fn cmp_json_for_sort(a: &Value, b: &Value, ascending: bool) -> Ordering {
        use Ordering::*;
        use serde_json::Value::*;
        let ord = match (a, b) {
            (Null, Null) => return Equal,
            (Null, _) => return Greater,
            (_, Null) => return Less,
            (Bool(x), Bool(y)) => x.cmp(y),
            (Number(x), Number(y)) => match (x.as_i64(), y.as_i64()) {
                (Some(ix), Some(iy)) => ix.cmp(&iy),
                _ => match (x.as_f64(), y.as_f64()) {
                    (Some(fx), Some(fy)) => fx.partial_cmp(&fy).unwrap_or(Equal),
                    _ => Equal,
                },
            },
            (String(x), String(y)) => x.to_lowercase().cmp(&y.to_lowercase()).then_with(|| x.cmp(y)),
            (Array(_), Array(_)) | (Object(_), Object(_)) => a.to_string().cmp(&b.to_string()),
            (lhs, rhs) => Self::type_rank(lhs).cmp(&Self::type_rank(rhs)),
        };
        if ascending { ord } else { ord.reverse() }
    }

    fn type_rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0, Value::Bool(_) => 1, Value::Number(_) => 2, Value::String(_) => 3,
            Value::Array(_) => 4, Value::Object(_) => 5
        }
    }

    /// Stable sort on `(row key, descending)` pairs, NULLS LAST in both directions.
    pub fn sort_rows(rows: &mut [Row], keys: &[(String, bool)]) {
        if keys.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            for (key, descending) in keys {
                let ord = Self::cmp_json_for_sort(&a.value(key), &b.value(key), !descending);
                if !ord.is_eq() {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Rows `[(page - 1) * count, page * count)`.
    pub fn page_window(rows: Vec<Row>, page: u32, count: u32) -> Vec<Row> {
        let start = (page.max(1) as usize - 1) * count as usize;
        rows.into_iter().skip(start).take(count as usize).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Helpers;
    use crate::executor::Row;
    use serde_json::{json, Value};
    use std::cmp::Ordering::*;

    #[test]
    fn nulls_sort_last_in_both_directions() {
        assert_eq!(Helpers::cmp_json_for_sort(&Value::Null, &json!(1), true), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&Value::Null, &json!(1), false), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(1), &Value::Null, false), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&Value::Null, &Value::Null, true), Equal);
    }

    #[test]
    fn numbers_and_text_compare_naturally() {
        assert_eq!(Helpers::cmp_json_for_sort(&json!(2), &json!(10), true), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(2.5), &json!(2), true), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&json!("apple"), &json!("Banana"), true), Less);
        assert_eq!(Helpers::cmp_json_for_sort(&json!("apple"), &json!("Banana"), false), Greater);
        assert_eq!(Helpers::cmp_json_for_sort(&json!(true), &json!("x"), true), Less);
    }

    #[test]
    fn sort_rows_uses_keys_in_order() {
        let mut rows: Vec<Row> = [
            json!({"a": 1, "b": "y"}),
            json!({"a": null, "b": "z"}),
            json!({"a": 1, "b": "x"}),
            json!({"a": 0, "b": "w"}),
        ].into_iter().filter_map(Row::from_value).collect();
        Helpers::sort_rows(&mut rows, &[("a".into(), true), ("b".into(), false)]);
        let b: Vec<_> = rows.iter().map(|r| r.value("b")).collect();
        assert_eq!(b, vec![json!("x"), json!("y"), json!("w"), json!("z")]);
    }

    #[test]
    fn page_window_slices_one_page() {
        let rows: Vec<Row> = (0..7).filter_map(|i| Row::from_value(json!({"i": i}))).collect();
        let page: Vec<_> = Helpers::page_window(rows, 2, 3).iter().map(|r| r.value("i")).collect();
        assert_eq!(page, vec![json!(3), json!(4), json!(5)]);
    }
}
