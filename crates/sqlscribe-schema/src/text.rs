//! The schema text shown to the user and handed to the agent

use sqlscribe_core::{ConnectionConfig, DatabaseDriver, SchemaSnapshot, TableSelection};

use crate::ddl::is_reconstruction_failure;
use crate::{CatalogError, DdlSynthesizer, read_schema};

const UNAVAILABLE_NOTICE: &str = "Schema could not be retrieved for display.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradedReason {
    NoTables,
    TargetsMissing,
    RetrievalFailed,
    ReconstructionFailed,
}

/// Outcome of reading and rendering the schema once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaText {
    Ready(String),
    Degraded {
        reason: DegradedReason,
        marker: String,
    },
}

impl SchemaText {
    pub fn from_outcome(
        outcome: Result<SchemaSnapshot, CatalogError>,
        synthesizer: &DdlSynthesizer,
    ) -> Self {
        match outcome {
            Ok(snapshot) => {
                let ddl = synthesizer.synthesize(&snapshot);
                if is_reconstruction_failure(&ddl) {
                    SchemaText::Degraded {
                        reason: DegradedReason::ReconstructionFailed,
                        marker: ddl,
                    }
                } else {
                    SchemaText::Ready(ddl)
                }
            }
            Err(err) => {
                let reason = match err {
                    CatalogError::NoTablesFound { .. } => DegradedReason::NoTables,
                    CatalogError::TargetTablesNotFound { .. } => DegradedReason::TargetsMissing,
                    CatalogError::ConnectionFailed { .. } => DegradedReason::RetrievalFailed,
                };
                SchemaText::Degraded {
                    reason,
                    marker: err.marker(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SchemaText::Ready(_))
    }

    /// DDL for the agent's system prompt; degraded text is never sent
    pub fn agent_context(&self) -> Option<&str> {
        match self {
            SchemaText::Ready(ddl) => Some(ddl.as_str()),
            SchemaText::Degraded { .. } => None,
        }
    }

    /// What the `schema` command prints.
    /// Missing-table markers are shown as is; failures get a generic notice.
    pub fn display_text(&self) -> &str {
        match self {
            SchemaText::Ready(ddl) => ddl.as_str(),
            SchemaText::Degraded {
                reason: DegradedReason::NoTables | DegradedReason::TargetsMissing,
                marker,
            } => marker.as_str(),
            SchemaText::Degraded { .. } => UNAVAILABLE_NOTICE,
        }
    }
}

/// Read and render the schema, degrading instead of failing
pub async fn load_schema_text(
    driver: &dyn DatabaseDriver,
    config: &ConnectionConfig,
    selection: &TableSelection,
    synthesizer: &DdlSynthesizer,
) -> SchemaText {
    let outcome = read_schema(driver, config, selection).await;
    if let Err(e) = &outcome {
        tracing::warn!(error = %e, "could not retrieve schema; agent setup will proceed");
    }

    let text = SchemaText::from_outcome(outcome, synthesizer);
    if let SchemaText::Degraded { reason, marker } = &text {
        tracing::warn!(?reason, marker = %marker, "schema text degraded");
    } else {
        tracing::info!("reconstructed database schema text");
    }
    text
}
