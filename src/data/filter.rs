use std::collections::BTreeSet;

use super::model::{CellValue, DATE_FORMAT, Family, KeyedTable, parse_date};

// ---------------------------------------------------------------------------
// Row predicate: (store, date, family ∈ selected)
// ---------------------------------------------------------------------------

/// Return indices of the prediction rows matching the selection.
pub fn filter_predictions(
    predictions: &KeyedTable,
    store: &CellValue,
    date: &str,
    families: &BTreeSet<Family>,
) -> Vec<usize> {
    filtered_indices(predictions, store, date, families)
}

/// Return indices of the SHAP rows (either split) matching the selection.
pub fn filter_shap(
    shap: &KeyedTable,
    store: &CellValue,
    date: &str,
    families: &BTreeSet<Family>,
) -> Vec<usize> {
    filtered_indices(shap, store, date, families)
}

/// Indices of rows passing the predicate, in source order.
///
/// A row passes when:
/// * its store equals `store`
/// * its date, formatted `YYYY-MM-DD`, equals `date` (a row without a
///   valid date never passes, nor does any row if `date` is not a date)
/// * its family is in `families` (an empty set → nothing passes)
fn filtered_indices(
    table: &KeyedTable,
    store: &CellValue,
    date: &str,
    families: &BTreeSet<Family>,
) -> Vec<usize> {
    if families.is_empty() {
        return Vec::new();
    }
    // Comparing parsed dates is equivalent to comparing the canonical text.
    let Some(date) = parse_date(date).filter(|d| d.format(DATE_FORMAT).to_string() == date)
    else {
        return Vec::new();
    };

    table
        .rows
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            row.store == *store
                && row.date == Some(date)
                && row.family.as_ref().is_some_and(|f| families.contains(f))
        })
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FamilyPool, KeyedRow};
    use chrono::NaiveDate;

    fn table(pool: &mut FamilyPool, rows: &[(i64, &str, &str, f64)]) -> KeyedTable {
        KeyedTable {
            name: "predictions".into(),
            value_columns: vec!["pred_mean".into()],
            rows: rows
                .iter()
                .map(|&(store, date, family, pred)| KeyedRow {
                    store: CellValue::Integer(store),
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
                    family: Some(pool.intern(family)),
                    values: vec![CellValue::Float(pred)],
                })
                .collect(),
            dropped_dates: 0,
        }
    }

    fn families(pool: &mut FamilyPool, names: &[&str]) -> BTreeSet<Family> {
        names.iter().map(|n| pool.intern(n)).collect()
    }

    fn sample(pool: &mut FamilyPool) -> KeyedTable {
        table(
            pool,
            &[
                (1, "2017-08-15", "GROCERY", 10.0),
                (1, "2017-08-15", "DAIRY", 20.0),
                (1, "2017-08-16", "GROCERY", 30.0),
                (2, "2017-08-15", "GROCERY", 40.0),
                (1, "2017-08-15", "GROCERY", 50.0),
                (1, "bad", "GROCERY", 60.0),
            ],
        )
    }

    #[test]
    fn selects_only_chosen_family() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let grocery = families(&mut pool, &["GROCERY"]);

        let idx = filter_predictions(&t, &CellValue::Integer(1), "2017-08-15", &grocery);
        assert_eq!(idx, vec![0, 4]);
    }

    #[test]
    fn empty_family_set_yields_nothing() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let none = BTreeSet::new();

        assert!(filter_predictions(&t, &CellValue::Integer(1), "2017-08-15", &none).is_empty());
        assert!(filter_shap(&t, &CellValue::Integer(1), "2017-08-15", &none).is_empty());
    }

    #[test]
    fn full_family_set_is_a_no_op() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let all = families(&mut pool, &["GROCERY", "DAIRY"]);

        let idx = filter_predictions(&t, &CellValue::Integer(1), "2017-08-15", &all);
        assert_eq!(idx, vec![0, 1, 4]);
    }

    #[test]
    fn inconsistent_selection_is_empty_not_an_error() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let grocery = families(&mut pool, &["GROCERY"]);

        assert!(filter_predictions(&t, &CellValue::Integer(2), "2017-08-16", &grocery).is_empty());
        assert!(filter_predictions(&t, &CellValue::Integer(9), "2017-08-15", &grocery).is_empty());
        assert!(filter_predictions(&t, &CellValue::Integer(1), "garbage", &grocery).is_empty());
        // Only the canonical text form matches.
        assert!(
            filter_predictions(&t, &CellValue::Integer(1), "2017-08-15 00:00:00", &grocery)
                .is_empty()
        );
    }

    #[test]
    fn store_type_must_match() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let grocery = families(&mut pool, &["GROCERY"]);

        let as_text = CellValue::String("1".into());
        assert!(filter_predictions(&t, &as_text, "2017-08-15", &grocery).is_empty());
    }

    #[test]
    fn source_table_is_untouched() {
        let mut pool = FamilyPool::default();
        let t = sample(&mut pool);
        let before = t.len();
        let all = families(&mut pool, &["GROCERY", "DAIRY"]);

        let _ = filter_predictions(&t, &CellValue::Integer(1), "2017-08-15", &all);
        assert_eq!(t.len(), before);
        assert_eq!(t.rows[5].date, None);
    }
}
