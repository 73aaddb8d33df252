use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;

/// Column holding the store identifier in keyed tables.
pub const STORE_COLUMN: &str = "store_nbr";
/// Column holding the calendar date in keyed tables.
pub const DATE_COLUMN: &str = "date";
/// Column holding the product family in keyed tables.
pub const FAMILY_COLUMN: &str = "family";
/// Column holding the averaged model prediction.
pub const PRED_MEAN_COLUMN: &str = "pred_mean";
/// Canonical external date representation.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// CellValue – a single cell of a loaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a pandas export produces.
/// Store identifiers live in `BTreeSet`s downstream, so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                String(_) => 4,
                Date(_) => 5,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) if *v != 0.0 && v.abs() < 1e-3 => write!(f, "{v:.3e}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64`; numeric text counts too.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Canonical form of a store key. A whole-number float (an integer column
    /// that held a NaN upstream) becomes an `Integer`, so `1.0` matches `1`.
    pub fn into_store_key(self) -> CellValue {
        match self {
            CellValue::Float(v)
                if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 =>
            {
                CellValue::Integer(v as i64)
            }
            other => other,
        }
    }

    /// Interpret the value as a calendar date. Text is parsed leniently;
    /// anything unparseable yields `None`.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            CellValue::String(s) => parse_date(s),
            _ => None,
        }
    }
}

/// Parse `YYYY-MM-DD`, optionally followed by a time part
/// (`YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`).
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, DATE_FORMAT) {
        return Some(d);
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| chrono::NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}

// ---------------------------------------------------------------------------
// Family – categorical product family
// ---------------------------------------------------------------------------

/// An interned product-family label.
///
/// Every table of one load interns through the same [`FamilyPool`], so two
/// equal families usually share storage and compare by pointer first.
#[derive(Debug, Clone, Eq)]
pub struct Family(Arc<str>);

impl Family {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Family {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl std::hash::Hash for Family {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl PartialOrd for Family {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Family {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Family {
    fn from(s: &str) -> Self {
        Family(Arc::from(s))
    }
}

/// The shared family vocabulary of a load.
#[derive(Debug, Default)]
pub struct FamilyPool {
    interned: HashMap<String, Family>,
}

impl FamilyPool {
    pub fn intern(&mut self, label: &str) -> Family {
        if let Some(f) = self.interned.get(label) {
            return f.clone();
        }
        let family = Family::from(label);
        self.interned.insert(label.to_string(), family.clone());
        family
    }

    /// Every family seen so far, sorted.
    pub fn vocabulary(&self) -> BTreeSet<Family> {
        self.interned.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// Keyed tables – predictions and SHAP rows
// ---------------------------------------------------------------------------

/// One row keyed by (store, date, family).
#[derive(Debug, Clone)]
pub struct KeyedRow {
    /// `Null` when the table has no store column.
    pub store: CellValue,
    /// `None` when missing or unparseable.
    pub date: Option<NaiveDate>,
    pub family: Option<Family>,
    /// Remaining columns, aligned with [`KeyedTable::value_columns`].
    pub values: Vec<CellValue>,
}

impl KeyedRow {
    pub fn date_string(&self) -> Option<String> {
        self.date.map(|d| d.format(DATE_FORMAT).to_string())
    }
}

/// A read-only table of keyed rows in source order.
#[derive(Debug, Clone)]
pub struct KeyedTable {
    pub name: String,
    /// Names of every non-key column, in source order.
    pub value_columns: Vec<String>,
    pub rows: Vec<KeyedRow>,
    /// Rows whose date is missing or could not be parsed.
    pub dropped_dates: usize,
}

impl KeyedTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a value column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c == name)
    }

    /// Value of `column` in row `row`, if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.values.get(col)
    }
}

// ---------------------------------------------------------------------------
// Mean |SHAP| tables
// ---------------------------------------------------------------------------

/// Aggregated importance of one feature over a split.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureImportance {
    pub feature: String,
    pub mean_abs_shap: f64,
}

/// One row per feature, in source order.
#[derive(Debug, Clone, Default)]
pub struct MeanShapTable {
    pub rows: Vec<FeatureImportance>,
}

impl MeanShapTable {
    /// Rows sorted by `mean_abs_shap` descending. The sort is stable so
    /// ties keep their source order.
    pub fn sorted_descending(&self) -> Vec<FeatureImportance> {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| b.mean_abs_shap.total_cmp(&a.mean_abs_shap));
        rows
    }
}

// ---------------------------------------------------------------------------
// ForecastTables – everything a load produces
// ---------------------------------------------------------------------------

/// Row/column/drop counts of one loaded source.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub dropped_dates: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tables: Vec<TableSummary>,
}

impl LoadReport {
    pub fn total_dropped_dates(&self) -> usize {
        self.tables.iter().map(|t| t.dropped_dates).sum()
    }
}

/// The complete, immutable result of loading the six forecast sources.
#[derive(Debug)]
pub struct ForecastTables {
    pub predictions: KeyedTable,
    pub val_shap: KeyedTable,
    pub val_mean_shap: MeanShapTable,
    pub test_shap: KeyedTable,
    pub test_mean_shap: MeanShapTable,
    /// SHAP baseline of the model output.
    pub expected_value: f64,
    pub families: BTreeSet<Family>,
    pub report: LoadReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_timestamp_dates() {
        let d = NaiveDate::from_ymd_opt(2017, 8, 15).unwrap();
        assert_eq!(parse_date("2017-08-15"), Some(d));
        assert_eq!(parse_date(" 2017-08-15 00:00:00 "), Some(d));
        assert_eq!(parse_date("2017-08-15T12:30:00"), Some(d));
        assert_eq!(parse_date("15/08/2017"), None);
        assert_eq!(parse_date("2017-02-30"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn integer_stores_order_numerically() {
        let mut stores: Vec<CellValue> = [10, 2, 1].into_iter().map(CellValue::Integer).collect();
        stores.sort();
        assert_eq!(
            stores,
            vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Integer(10)]
        );
    }

    #[test]
    fn whole_float_store_keys_become_integers() {
        assert_eq!(CellValue::Float(1.0).into_store_key(), CellValue::Integer(1));
        assert_eq!(CellValue::Float(-3.0).into_store_key(), CellValue::Integer(-3));
        assert_eq!(CellValue::Float(1.5).into_store_key(), CellValue::Float(1.5));
        assert!(matches!(CellValue::Float(f64::NAN).into_store_key(), CellValue::Float(_)));
        assert_eq!(
            CellValue::String("A".into()).into_store_key(),
            CellValue::String("A".into())
        );
    }

    #[test]
    fn tiny_floats_keep_significant_digits() {
        assert_eq!(CellValue::Float(0.123456).to_string(), "0.1235");
        assert_eq!(CellValue::Float(0.0).to_string(), "0.0000");
        assert_eq!(CellValue::Float(0.00002).to_string(), "2.000e-5");
        assert_eq!(CellValue::Float(-0.000031).to_string(), "-3.100e-5");
    }

    #[test]
    fn pool_interns_shared_labels() {
        let mut pool = FamilyPool::default();
        let a = pool.intern("GROCERY I");
        let b = pool.intern("GROCERY I");
        let c = pool.intern("DAIRY");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.vocabulary().len(), 2);
        assert_eq!(pool.vocabulary().into_iter().next().unwrap().as_str(), "DAIRY");
    }

    #[test]
    fn mean_shap_sort_is_descending_and_stable() {
        let table = MeanShapTable {
            rows: vec![
                FeatureImportance { feature: "a".into(), mean_abs_shap: 0.5 },
                FeatureImportance { feature: "b".into(), mean_abs_shap: 2.0 },
                FeatureImportance { feature: "c".into(), mean_abs_shap: 0.5 },
                FeatureImportance { feature: "d".into(), mean_abs_shap: 1.0 },
            ],
        };
        let order: Vec<String> = table
            .sorted_descending()
            .into_iter()
            .map(|r| r.feature)
            .collect();
        assert_eq!(order, vec!["b", "d", "a", "c"]);
    }
}
