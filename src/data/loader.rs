use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Date32Type, Float64Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{
    CellValue, DATE_COLUMN, FAMILY_COLUMN, FamilyPool, FeatureImportance, ForecastTables,
    KeyedRow, KeyedTable, LoadReport, MeanShapTable, PRED_MEAN_COLUMN, STORE_COLUMN,
    TableSummary,
};
use crate::config::DataSources;
use crate::features::FORCE_PLOT_FEATURES;
use crate::error::LoadError;

const FEATURE_COLUMN: &str = "feature";
const MEAN_ABS_SHAP_COLUMN: &str = "mean_abs_shap";
const EXPECTED_VALUE_COLUMN: &str = "expected_value";

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Read all six forecast sources and normalise them into [`ForecastTables`].
///
/// Every source is read exactly once. Dates that fail to parse become
/// `None` and are counted in the returned [`LoadReport`].
pub fn load_tables(sources: &DataSources) -> Result<ForecastTables, LoadError> {
    let mut pool = FamilyPool::default();

    let predictions = keyed_table(
        read_source("predictions", &sources.path(&sources.predictions))?,
        &mut pool,
        Keys::Required,
    )?;
    let val_shap = keyed_table(
        read_source("val_shap_values", &sources.path(&sources.val_shap))?,
        &mut pool,
        Keys::Optional,
    )?;
    let val_mean_shap = mean_shap_table(read_source(
        "val_mean_shap",
        &sources.path(&sources.val_mean_shap),
    )?)?;
    let test_shap = keyed_table(
        read_source("test_shap", &sources.path(&sources.test_shap))?,
        &mut pool,
        Keys::Required,
    )?;
    let test_mean_shap = mean_shap_table(read_source(
        "test_mean_shap",
        &sources.path(&sources.test_mean_shap),
    )?)?;
    let expected_value = expected_value(&read_source(
        "expected_value",
        &sources.path(&sources.expected_value),
    )?)?;

    if predictions.column_index(PRED_MEAN_COLUMN).is_none() {
        return Err(LoadError::MissingColumn {
            table: predictions.name.clone(),
            column: PRED_MEAN_COLUMN.to_string(),
        });
    }
    check_features(&test_shap, FORCE_PLOT_FEATURES)?;
    if predictions.is_empty() {
        log::warn!("{}: no rows, nothing can be selected", predictions.name);
    }

    let report = LoadReport {
        tables: vec![
            keyed_summary(&predictions),
            keyed_summary(&val_shap),
            mean_shap_summary("val_mean_shap", &val_mean_shap),
            keyed_summary(&test_shap),
            mean_shap_summary("test_mean_shap", &test_mean_shap),
        ],
    };
    for t in &report.tables {
        log::info!(
            "{}: {} rows x {} columns, {} rows without a valid date",
            t.name,
            t.rows,
            t.columns,
            t.dropped_dates
        );
        if t.dropped_dates > 0 {
            log::warn!(
                "{}: {} rows have a missing or unparseable date and will never match a selection",
                t.name,
                t.dropped_dates
            );
        }
    }
    log::info!("expected_value = {expected_value}");

    Ok(ForecastTables {
        predictions,
        val_shap,
        val_mean_shap,
        test_shap,
        test_mean_shap,
        expected_value,
        families: pool.vocabulary(),
        report,
    })
}

/// Fail with [`LoadError::MissingFeatures`] unless every name in `features`
/// is a value column of `table`.
pub fn check_features(table: &KeyedTable, features: &[&str]) -> Result<(), LoadError> {
    let missing: Vec<String> = features
        .iter()
        .filter(|f| table.column_index(f).is_none())
        .map(|f| f.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingFeatures {
            table: table.name.clone(),
            missing,
        })
    }
}

fn keyed_summary(table: &KeyedTable) -> TableSummary {
    TableSummary {
        name: table.name.clone(),
        rows: table.len(),
        columns: table.value_columns.len(),
        dropped_dates: table.dropped_dates,
    }
}

fn mean_shap_summary(name: &str, table: &MeanShapTable) -> TableSummary {
    TableSummary {
        name: name.to_string(),
        rows: table.rows.len(),
        columns: 2,
        dropped_dates: 0,
    }
}

// ---------------------------------------------------------------------------
// Raw tables: file → columns + cells
// ---------------------------------------------------------------------------

/// An untyped table straight from a file.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    fn require(&self, column: &str) -> Result<usize, LoadError> {
        self.position(column).ok_or_else(|| LoadError::MissingColumn {
            table: self.name.clone(),
            column: column.to_string(),
        })
    }
}

/// Read one source, dispatching by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one column per field
/// * `.parquet` – as written by `df.to_parquet()` (pandas index columns are skipped)
pub fn read_source(name: &str, path: &Path) -> Result<RawTable, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "csv" => read_csv(path),
        "parquet" | "pq" => read_parquet(path),
        _ => {
            return Err(LoadError::UnsupportedFormat {
                table: name.to_string(),
                path: path.to_path_buf(),
            });
        }
    };

    parsed
        .map(|(columns, rows)| RawTable {
            name: name.to_string(),
            columns,
            rows,
        })
        .map_err(|source| LoadError::Read {
            table: name.to_string(),
            path: path.to_path_buf(),
            source,
        })
}

type Cells = (Vec<String>, Vec<Vec<CellValue>>);

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

fn read_csv(path: &Path) -> Result<Cells> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                headers.len(),
                record.len()
            );
        }
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    Ok((headers, rows))
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    match s {
        "True" | "true" => CellValue::Bool(true),
        "False" | "false" => CellValue::Bool(false),
        _ => CellValue::String(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

fn read_parquet(path: &Path) -> Result<Cells> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut columns: Option<Vec<(usize, String)>> = None;
    let mut rows = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let kept = columns.get_or_insert_with(|| {
            schema
                .fields()
                .iter()
                .enumerate()
                .filter(|(_, f)| !f.name().starts_with("__index_level_"))
                .map(|(i, f)| (i, f.name().clone()))
                .collect()
        });

        let arrays: Vec<ArrayRef> = kept
            .iter()
            .map(|(i, name)| {
                normalize_array(batch.column(*i))
                    .with_context(|| format!("converting column '{name}'"))
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            rows.push(arrays.iter().map(|a| cell_from_arrow(a, row)).collect());
        }
    }

    let headers = columns
        .unwrap_or_default()
        .into_iter()
        .map(|(_, name)| name)
        .collect();
    Ok((headers, rows))
}

/// Cast an Arrow column to one of the few types [`cell_from_arrow`] reads:
/// Utf8, Int64, Float64, Boolean or Date32. Pandas `category` columns arrive
/// as dictionaries and become plain strings.
fn normalize_array(col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Dictionary(_, _) | DataType::LargeUtf8 | DataType::Utf8View => DataType::Utf8,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => DataType::Int64,
        DataType::Float16 | DataType::Float32 => DataType::Float64,
        DataType::Date64 | DataType::Timestamp(_, _) => DataType::Date32,
        _ => return Ok(col.clone()),
    };
    Ok(arrow::compute::cast(col, &target)?)
}

/// Extract a single cell from a normalized Arrow column.
fn cell_from_arrow(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float64 => CellValue::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 => col
            .as_primitive::<Date32Type>()
            .value_as_date(row)
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        other => CellValue::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// Typed tables
// ---------------------------------------------------------------------------

/// Whether the (store, date, family) key columns must be present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keys {
    Required,
    /// Absent key columns leave the corresponding row fields empty.
    Optional,
}

/// Split key columns from value columns, parse dates and intern families.
pub fn keyed_table(
    raw: RawTable,
    pool: &mut FamilyPool,
    keys: Keys,
) -> Result<KeyedTable, LoadError> {
    let locate = |column: &str| match keys {
        Keys::Required => raw.require(column).map(Some),
        Keys::Optional => Ok(raw.position(column)),
    };
    let store_idx = locate(STORE_COLUMN)?;
    let date_idx = locate(DATE_COLUMN)?;
    let family_idx = locate(FAMILY_COLUMN)?;
    let is_key = |i: usize| Some(i) == store_idx || Some(i) == date_idx || Some(i) == family_idx;

    let value_columns: Vec<String> = raw
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !is_key(*i))
        .map(|(_, c)| c.clone())
        .collect();

    let mut dropped_dates = 0;
    let mut rows = Vec::with_capacity(raw.rows.len());

    for cells in raw.rows {
        let store = store_idx
            .map(|i| cells[i].clone().into_store_key())
            .unwrap_or(CellValue::Null);
        let date = date_idx.and_then(|i| cells[i].as_date());
        if date_idx.is_some() && date.is_none() {
            dropped_dates += 1;
        }
        let family = family_idx.and_then(|i| match &cells[i] {
            CellValue::Null => None,
            CellValue::String(s) => Some(pool.intern(s)),
            other => Some(pool.intern(&other.to_string())),
        });
        let values = cells
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !is_key(*i))
            .map(|(_, v)| v)
            .collect();

        rows.push(KeyedRow {
            store,
            date,
            family,
            values,
        });
    }

    Ok(KeyedTable {
        name: raw.name,
        value_columns,
        rows,
        dropped_dates,
    })
}

/// Build a `(feature, mean_abs_shap)` table.
pub fn mean_shap_table(raw: RawTable) -> Result<MeanShapTable, LoadError> {
    let feature_idx = raw.require(FEATURE_COLUMN)?;
    let value_idx = raw.require(MEAN_ABS_SHAP_COLUMN)?;

    let rows = raw
        .rows
        .iter()
        .enumerate()
        .map(|(row, cells)| -> Result<FeatureImportance, LoadError> {
            let value = &cells[value_idx];
            let mean_abs_shap = value.as_f64().ok_or_else(|| LoadError::InvalidValue {
                table: raw.name.clone(),
                row,
                column: MEAN_ABS_SHAP_COLUMN.to_string(),
                value: value.to_string(),
            })?;
            let feature = match &cells[feature_idx] {
                CellValue::String(s) => s.clone(),
                other => other.to_string(),
            };
            Ok(FeatureImportance {
                feature,
                mean_abs_shap,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MeanShapTable { rows })
}

/// The SHAP baseline: first row of the `expected_value` column.
pub fn expected_value(raw: &RawTable) -> Result<f64, LoadError> {
    let idx = raw.require(EXPECTED_VALUE_COLUMN)?;
    let cell = raw
        .rows
        .first()
        .map(|cells| &cells[idx])
        .ok_or_else(|| LoadError::EmptyTable {
            table: raw.name.clone(),
        })?;
    cell.as_f64().ok_or_else(|| LoadError::InvalidValue {
        table: raw.name.clone(),
        row: 0,
        column: EXPECTED_VALUE_COLUMN.to_string(),
        value: cell.to_string(),
    })
}
