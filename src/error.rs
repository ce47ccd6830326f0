use thiserror::Error;
use tracing::warn;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A numeric range with no width, e.g. equal min and max.
    #[error("degenerate range: {message}")]
    Domain { message: String },

    /// Empty or invalid configuration data (tables, range sets, bands).
    #[error("invalid configuration: {message}")]
    Configuration { message: String },

    /// A report field that cannot be written under the chosen quoting rule.
    #[error("cannot encode field {column:?} in row {row}: {reason}")]
    Encoding {
        row: usize,
        column: String,
        reason: String,
    },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn domain(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "daypart::config", %message, "degenerate range");
        EngineError::Domain { message }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "daypart::config", %message, "configuration rejected");
        EngineError::Configuration { message }
    }

    pub fn encoding(row: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        let column = column.into();
        let reason = reason.into();
        warn!(target: "daypart::report", row, %column, %reason, "field cannot be encoded");
        EngineError::Encoding {
            row,
            column,
            reason,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EngineError::Configuration { .. } | EngineError::Domain { .. }
        )
    }
}
