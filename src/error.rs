use std::path::PathBuf;

/// Fatal startup failures: a source, a column or the config is missing or malformed.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {table} from {}", path.display())]
    Read {
        table: String,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("{table}: unsupported file extension in {}", path.display())]
    UnsupportedFormat { table: String, path: PathBuf },

    #[error("{table}: missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table}: missing feature columns: {}", missing.join(", "))]
    MissingFeatures { table: String, missing: Vec<String> },

    #[error("{table}: no data rows")]
    EmptyTable { table: String },

    #[error("{table}, row {row}: '{value}' in column '{column}' is not a number")]
    InvalidValue {
        table: String,
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid configuration in {}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
