//! Domain error types.

/// Top-level error type for neozork.
#[derive(Debug, thiserror::Error)]
pub enum NeozorkError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("malformed data at row {row}: {reason}")]
    DataFormat { row: usize, reason: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("no data: {reason}")]
    EmptyData { reason: String },

    #[error("frame error: {reason}")]
    Frame { reason: String },
}

impl NeozorkError {
    pub fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        NeozorkError::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&NeozorkError> for std::process::ExitCode {
    fn from(err: &NeozorkError) -> Self {
        let code: u8 = match err {
            NeozorkError::Io(_) => 1,
            NeozorkError::Csv(e) if e.is_io_error() => 1,
            NeozorkError::ConfigParse { .. } | NeozorkError::ConfigInvalid { .. } => 2,
            NeozorkError::Csv(_)
            | NeozorkError::Parquet(_)
            | NeozorkError::Arrow(_)
            | NeozorkError::DataFormat { .. }
            | NeozorkError::MissingColumn { .. }
            | NeozorkError::Frame { .. } => 3,
            NeozorkError::InvalidParameter { .. } => 4,
            NeozorkError::EmptyData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
