//! sqlscribe core - shared abstractions for the schema reader and the query agent
//!
//! This crate defines the seams every other sqlscribe crate depends on:
//!
//! - `DatabaseDriver` - opens connections from a `ConnectionConfig`
//! - `Connection` / `Transaction` - query execution against a live session
//! - `CatalogIntrospection` - batched reads of the relational catalog
//! - the catalog data model (`ColumnSpec`, `TableSchema`, `SchemaSnapshot`, ...)
//! - common value types like `Value`, `Row` and `QueryResult`

mod catalog;
mod connection;
mod driver;
mod error;
mod types;

pub use catalog::*;
pub use connection::*;
pub use driver::*;
pub use error::*;
pub use types::*;
