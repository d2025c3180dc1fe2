//! Schema snapshots and their DDL rendering
//!
//! `read_schema` pulls a `SchemaSnapshot` out of the catalog in one read-only
//! session, [`DdlSynthesizer`] turns it into `CREATE TABLE` text, and
//! [`SchemaText`] is what the rest of the program sees: either ready DDL or a
//! degraded marker explaining why there is none.

mod ddl;
mod error;
mod reader;
mod text;

pub use ddl::{
    DdlSynthesizer, RECONSTRUCTION_FAILED_PREFIX, SequenceDefaultPolicy, is_reconstruction_failure,
    synthesize,
};
pub use error::CatalogError;
pub use reader::{assemble_snapshot, read_schema, read_snapshot};
pub use text::{DegradedReason, SchemaText, load_schema_text};
