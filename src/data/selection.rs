use std::collections::{BTreeSet, HashSet};

use super::model::{CellValue, DATE_FORMAT, Family, KeyedTable, parse_date};

// ---------------------------------------------------------------------------
// Selectable options, derived from the predictions table
// ---------------------------------------------------------------------------

/// All distinct store identifiers.
pub fn available_stores(predictions: &KeyedTable) -> BTreeSet<CellValue> {
    predictions
        .rows
        .iter()
        .filter(|r| r.store != CellValue::Null)
        .map(|r| r.store.clone())
        .collect()
}

/// Distinct `YYYY-MM-DD` dates of one store, in order of first appearance.
pub fn available_dates(predictions: &KeyedTable, store: &CellValue) -> Vec<String> {
    let mut seen = HashSet::new();
    predictions
        .rows
        .iter()
        .filter(|r| r.store == *store)
        .filter_map(|r| r.date)
        .filter(|d| seen.insert(*d))
        .map(|d| d.format(DATE_FORMAT).to_string())
        .collect()
}

/// Distinct families present at `(store, date)`.
pub fn available_families(
    predictions: &KeyedTable,
    store: &CellValue,
    date: &str,
) -> BTreeSet<Family> {
    let Some(date) = parse_date(date) else {
        return BTreeSet::new();
    };
    predictions
        .rows
        .iter()
        .filter(|r| r.store == *store && r.date == Some(date))
        .filter_map(|r| r.family.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Selection
// ---------------------------------------------------------------------------

/// The user's current (store, date, families) choice.
///
/// Nothing here checks that the tuple is consistent; an inconsistent one
/// simply filters to no rows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    pub store: Option<CellValue>,
    pub date: Option<String>,
    pub families: BTreeSet<Family>,
}

impl Selection {
    /// First store, its first date, no families.
    pub fn initial(predictions: &KeyedTable) -> Self {
        let mut sel = Selection::default();
        if let Some(store) = available_stores(predictions).into_iter().next() {
            sel.set_store(predictions, store);
        }
        sel
    }

    /// Pick a store; the date moves to that store's first date.
    pub fn set_store(&mut self, predictions: &KeyedTable, store: CellValue) {
        self.date = available_dates(predictions, &store).into_iter().next();
        self.store = Some(store);
        self.retain_available(predictions);
    }

    /// Pick a date for the current store.
    pub fn set_date(&mut self, predictions: &KeyedTable, date: String) {
        self.date = Some(date);
        self.retain_available(predictions);
    }

    pub fn toggle_family(&mut self, family: &Family) {
        if !self.families.remove(family) {
            self.families.insert(family.clone());
        }
    }

    pub fn select_all_families(&mut self, predictions: &KeyedTable) {
        self.families = self.family_options(predictions);
    }

    pub fn clear_families(&mut self) {
        self.families.clear();
    }

    /// Families offered for the current (store, date).
    pub fn family_options(&self, predictions: &KeyedTable) -> BTreeSet<Family> {
        match (&self.store, &self.date) {
            (Some(store), Some(date)) => available_families(predictions, store, date),
            _ => BTreeSet::new(),
        }
    }

    /// Drop selected families that are not offered any more.
    fn retain_available(&mut self, predictions: &KeyedTable) {
        let options = self.family_options(predictions);
        self.families.retain(|f| options.contains(f));
    }
}

// ---------------------------------------------------------------------------
// Options offered by the selection widgets
// ---------------------------------------------------------------------------

/// Choices shown for the current selection. Rebuilt on selection changes,
/// not every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionOptions {
    pub stores: Vec<CellValue>,
    pub dates: Vec<String>,
    pub families: BTreeSet<Family>,
}

impl SelectionOptions {
    pub fn new(predictions: &KeyedTable, selection: &Selection) -> Self {
        let mut options = SelectionOptions {
            stores: available_stores(predictions).into_iter().collect(),
            ..Default::default()
        };
        options.update(predictions, selection);
        options
    }

    /// Recompute the dates and families. Stores do not change once loaded.
    pub fn update(&mut self, predictions: &KeyedTable, selection: &Selection) {
        self.dates = selection
            .store
            .as_ref()
            .map(|s| available_dates(predictions, s))
            .unwrap_or_default();
        self.families = selection.family_options(predictions);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{FamilyPool, KeyedRow};
    use chrono::NaiveDate;

    fn predictions(pool: &mut FamilyPool) -> KeyedTable {
        let rows = [
            (3, "2017-08-20", "DAIRY"),
            (1, "2017-08-16", "GROCERY"),
            (1, "2017-08-15", "GROCERY"),
            (1, "2017-08-16", "DAIRY"),
            (1, "2017-08-15", "DAIRY"),
            (3, "2017-08-21", "GROCERY"),
            (1, "broken", "BEVERAGES"),
        ];
        KeyedTable {
            name: "predictions".into(),
            value_columns: vec![],
            rows: rows
                .iter()
                .map(|&(store, date, family)| KeyedRow {
                    store: CellValue::Integer(store),
                    date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
                    family: Some(pool.intern(family)),
                    values: vec![],
                })
                .collect(),
            dropped_dates: 1,
        }
    }

    #[test]
    fn stores_are_distinct() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let stores: Vec<CellValue> = available_stores(&t).into_iter().collect();
        assert_eq!(stores, vec![CellValue::Integer(1), CellValue::Integer(3)]);
    }

    #[test]
    fn dates_are_per_store_in_appearance_order() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        assert_eq!(
            available_dates(&t, &CellValue::Integer(1)),
            vec!["2017-08-16", "2017-08-15"]
        );
        assert_eq!(
            available_dates(&t, &CellValue::Integer(3)),
            vec!["2017-08-20", "2017-08-21"]
        );
        assert!(available_dates(&t, &CellValue::Integer(7)).is_empty());
    }

    #[test]
    fn families_depend_on_store_and_date() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let fams: Vec<String> = available_families(&t, &CellValue::Integer(3), "2017-08-21")
            .iter()
            .map(|f| f.to_string())
            .collect();
        assert_eq!(fams, vec!["GROCERY"]);
        assert_eq!(
            available_families(&t, &CellValue::Integer(1), "2017-08-15").len(),
            2
        );
    }

    #[test]
    fn initial_selection_has_no_families() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let sel = Selection::initial(&t);
        assert_eq!(sel.store, Some(CellValue::Integer(1)));
        assert_eq!(sel.date.as_deref(), Some("2017-08-16"));
        assert!(sel.families.is_empty());
    }

    #[test]
    fn changing_store_resets_date_and_prunes_families() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let mut sel = Selection::initial(&t);
        sel.select_all_families(&t);
        assert_eq!(sel.families.len(), 2);

        sel.set_store(&t, CellValue::Integer(3));
        assert_eq!(sel.date.as_deref(), Some("2017-08-20"));
        let kept: Vec<&str> = sel.families.iter().map(Family::as_str).collect();
        assert_eq!(kept, vec!["DAIRY"]);
    }

    #[test]
    fn toggling_and_clearing_families() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let dairy = pool.intern("DAIRY");
        let mut sel = Selection::initial(&t);

        sel.toggle_family(&dairy);
        assert!(sel.families.contains(&dairy));
        sel.toggle_family(&dairy);
        assert!(sel.families.is_empty());

        sel.select_all_families(&t);
        sel.clear_families();
        assert!(sel.families.is_empty());
    }

    #[test]
    fn options_follow_the_selection() {
        let mut pool = FamilyPool::default();
        let t = predictions(&mut pool);
        let mut sel = Selection::initial(&t);
        let mut options = SelectionOptions::new(&t, &sel);
        assert_eq!(options.stores, vec![CellValue::Integer(1), CellValue::Integer(3)]);
        assert_eq!(options.dates, vec!["2017-08-16", "2017-08-15"]);
        assert_eq!(options.families, sel.family_options(&t));

        sel.set_store(&t, CellValue::Integer(3));
        options.update(&t, &sel);
        assert_eq!(options.dates, vec!["2017-08-20", "2017-08-21"]);
        let fams: Vec<&str> = options.families.iter().map(Family::as_str).collect();
        assert_eq!(fams, vec!["DAIRY"]);
        assert_eq!(options.stores.len(), 2);
    }
}
