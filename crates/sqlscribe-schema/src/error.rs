use sqlscribe_core::ScribeError;
use thiserror::Error;

/// Why a schema snapshot could not be produced
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no base tables found in schema '{schema}'")]
    NoTablesFound { schema: String },

    #[error("target tables [{}] not found in schema '{schema}'", .requested.join(", "))]
    TargetTablesNotFound {
        schema: String,
        requested: Vec<String>,
    },

    #[error("catalog read failed: {cause}")]
    ConnectionFailed {
        #[source]
        cause: ScribeError,
    },
}

impl From<ScribeError> for CatalogError {
    fn from(cause: ScribeError) -> Self {
        CatalogError::ConnectionFailed { cause }
    }
}

impl CatalogError {
    /// The one-line SQL comment shown in place of DDL
    pub fn marker(&self) -> String {
        match self {
            CatalogError::NoTablesFound { schema } => {
                format!("-- No tables found in {} schema --", schema)
            }
            CatalogError::TargetTablesNotFound { requested, .. } => {
                format!("-- Target tables [{}] not found --", requested.join(", "))
            }
            CatalogError::ConnectionFailed { cause } => {
                format!("-- Schema retrieval failed: {} --", cause)
            }
        }
    }
}
