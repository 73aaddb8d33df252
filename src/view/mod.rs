//! Everything the report panel shows, computed from (tables, selection).

pub mod force;

use crate::features::FORCE_PLOT_FEATURES;
use crate::data::filter::{filter_predictions, filter_shap};
use crate::data::model::{
    DATE_COLUMN, FAMILY_COLUMN, Family, FeatureImportance, ForecastTables, KeyedTable,
    PRED_MEAN_COLUMN, STORE_COLUMN,
};
use crate::data::selection::Selection;

use force::ForcePlot;

pub const NO_PREDICTIONS: &str = "No data for this selection. Select a product family.";
pub const NO_SHAP: &str = "No SHAP values for this selection (possibly outside the model's data).";
pub const NO_FORCE_PLOT: &str = "No matching test data.";

// ---------------------------------------------------------------------------
// Table views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub family: Option<Family>,
    pub cells: Vec<String>,
}

/// Pre-formatted rows ready for a table widget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl TableView {
    /// Key columns followed by `value_columns`, for the given rows of `table`.
    /// Unknown value columns are ignored.
    fn project(table: &KeyedTable, indices: &[usize], value_columns: &[&str]) -> Self {
        let picked: Vec<(usize, &str)> = value_columns
            .iter()
            .filter_map(|c| table.column_index(c).map(|i| (i, *c)))
            .collect();

        let columns = [STORE_COLUMN, DATE_COLUMN, FAMILY_COLUMN]
            .into_iter()
            .chain(picked.iter().map(|(_, c)| *c))
            .map(String::from)
            .collect();

        let rows = indices
            .iter()
            .filter_map(|&i| table.rows.get(i))
            .map(|row| {
                let mut cells = vec![
                    row.store.to_string(),
                    row.date_string().unwrap_or_else(|| "<null>".into()),
                    row.family
                        .as_ref()
                        .map(|f| f.to_string())
                        .unwrap_or_else(|| "<null>".into()),
                ];
                cells.extend(picked.iter().map(|(i, _)| row.values[*i].to_string()));
                TableRow {
                    family: row.family.clone(),
                    cells,
                }
            })
            .collect();

        TableView { columns, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// The whole report
// ---------------------------------------------------------------------------

/// The rendered state of every report section for one selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastView {
    /// Source indices of the matching prediction rows.
    pub prediction_rows: Vec<usize>,
    /// Matching prediction rows without `pred_mean`.
    pub raw: TableView,
    /// `(store_nbr, date, family, pred_mean)` of the matching rows.
    pub summary: TableView,
    pub val_importance: Vec<FeatureImportance>,
    pub test_importance: Vec<FeatureImportance>,
    /// Source indices of the matching test SHAP rows.
    pub shap_rows: Vec<usize>,
    pub shap: TableView,
    pub force_plot: Option<ForcePlot>,
}

impl ForecastView {
    /// Recompute every section from scratch.
    pub fn build(tables: &ForecastTables, selection: &Selection) -> Self {
        let (prediction_rows, shap_rows) = match (&selection.store, &selection.date) {
            (Some(store), Some(date)) => (
                filter_predictions(&tables.predictions, store, date, &selection.families),
                filter_shap(&tables.test_shap, store, date, &selection.families),
            ),
            _ => (Vec::new(), Vec::new()),
        };

        let predictions = &tables.predictions;
        let raw_columns: Vec<&str> = predictions
            .value_columns
            .iter()
            .map(String::as_str)
            .filter(|c| *c != PRED_MEAN_COLUMN)
            .collect();
        let raw = TableView::project(predictions, &prediction_rows, &raw_columns);
        let summary = TableView::project(predictions, &prediction_rows, &[PRED_MEAN_COLUMN]);

        let shap_columns: Vec<&str> = tables
            .test_shap
            .value_columns
            .iter()
            .map(String::as_str)
            .collect();
        let shap = TableView::project(&tables.test_shap, &shap_rows, &shap_columns);

        let force_plot = shap_rows.first().and_then(|&row| {
            ForcePlot::from_row(
                &tables.test_shap,
                row,
                FORCE_PLOT_FEATURES,
                tables.expected_value,
            )
        });

        ForecastView {
            prediction_rows,
            raw,
            summary,
            val_importance: tables.val_mean_shap.sorted_descending(),
            test_importance: tables.test_mean_shap.sorted_descending(),
            shap_rows,
            shap,
            force_plot,
        }
    }

    /// Advisory for the prediction sections, if they have nothing to show.
    pub fn predictions_advisory(&self) -> Option<&'static str> {
        self.prediction_rows.is_empty().then_some(NO_PREDICTIONS)
    }

    /// Advisory for the per-row SHAP section.
    pub fn shap_advisory(&self) -> Option<&'static str> {
        if self.prediction_rows.is_empty() {
            Some(NO_PREDICTIONS)
        } else if self.shap_rows.is_empty() {
            Some(NO_SHAP)
        } else {
            None
        }
    }

    pub fn force_plot_advisory(&self) -> Option<&'static str> {
        self.force_plot.is_none().then_some(NO_FORCE_PLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataSources;
    use crate::data::loader::load_tables;
    use crate::data::loader::tests::write_sample_dir;
    use crate::data::model::CellValue;

    fn tables() -> ForecastTables {
        let dir = tempfile::tempdir().unwrap();
        write_sample_dir(dir.path());
        load_tables(&DataSources::in_dir(dir.path())).unwrap()
    }

    fn select(tables: &ForecastTables, store: i64, date: &str, families: &[&str]) -> Selection {
        Selection {
            store: Some(CellValue::Integer(store)),
            date: Some(date.to_string()),
            families: tables
                .families
                .iter()
                .filter(|f| families.contains(&f.as_str()))
                .cloned()
                .collect(),
        }
    }

    #[test]
    fn grocery_selection_excludes_dairy() {
        let t = tables();
        let view = ForecastView::build(&t, &select(&t, 1, "2017-08-15", &["GROCERY I"]));

        assert_eq!(view.prediction_rows, vec![0]);
        assert_eq!(view.raw.columns, vec!["store_nbr", "date", "family", "onpromotion", "rolling_mean_7"]);
        assert_eq!(view.raw.rows[0].cells[..3], ["1", "2017-08-15", "GROCERY I"]);
        assert_eq!(view.summary.columns, vec!["store_nbr", "date", "family", "pred_mean"]);
        assert_eq!(view.summary.rows[0].cells[3], "130.2000");
        assert!(view.predictions_advisory().is_none());
    }

    #[test]
    fn no_families_means_advisories_everywhere() {
        let t = tables();
        let view = ForecastView::build(&t, &select(&t, 1, "2017-08-15", &[]));

        assert!(view.raw.is_empty());
        assert!(view.shap.is_empty());
        assert_eq!(view.predictions_advisory(), Some(NO_PREDICTIONS));
        assert_eq!(view.shap_advisory(), Some(NO_PREDICTIONS));
        assert_eq!(view.force_plot_advisory(), Some(NO_FORCE_PLOT));
        // Global importance charts do not depend on the selection.
        assert_eq!(view.test_importance.len(), 3);
    }

    #[test]
    fn predictions_without_shap_rows_show_shap_advisory() {
        let t = tables();
        // Store 1 on 2017-08-16 exists in predictions but not in the test SHAP table.
        let view = ForecastView::build(&t, &select(&t, 1, "2017-08-16", &["GROCERY I"]));

        assert_eq!(view.prediction_rows, vec![2]);
        assert!(view.shap_rows.is_empty());
        assert_eq!(view.shap_advisory(), Some(NO_SHAP));
        assert!(view.force_plot.is_none());
    }

    #[test]
    fn force_plot_uses_first_matching_row() {
        let t = tables();
        let view = ForecastView::build(&t, &select(&t, 1, "2017-08-15", &["DAIRY", "GROCERY I"]));

        assert_eq!(view.shap_rows, vec![0, 1]);
        let plot = view.force_plot.expect("force plot");
        // Row 1 (DAIRY) has smaller magnitudes; row 0 must win on order alone.
        assert!(plot.label.ends_with("GROCERY I"));
        assert_eq!(plot.base_value, 5.234);
        assert_eq!(plot.contributions.len(), FORCE_PLOT_FEATURES.len());
        assert_eq!(plot.contributions[0].feature, "store_nbr_shap");
        assert_eq!(plot.contributions[0].shap, -5.0);
    }

    #[test]
    fn importance_is_sorted_descending_with_stable_ties() {
        let t = tables();
        let view = ForecastView::build(&t, &Selection::default());
        let order: Vec<&str> = view
            .test_importance
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(order, vec!["year", "onpromotion", "rolling_mean_7"]);
        assert_eq!(view.val_importance[0].feature, "rolling_mean_7");
    }

    #[test]
    fn build_is_pure() {
        let t = tables();
        let sel = select(&t, 2, "2017-08-15", &["BEVERAGES"]);
        assert_eq!(ForecastView::build(&t, &sel), ForecastView::build(&t, &sel));
    }
}
