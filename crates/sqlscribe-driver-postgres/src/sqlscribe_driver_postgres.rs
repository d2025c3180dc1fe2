//! PostgreSQL driver implementation

mod catalog;
mod connection;
mod driver;
mod tls;
mod values;

#[cfg(test)]
mod live_tests;

pub use catalog::{COLUMNS_SQL, FOREIGN_KEYS_SQL, PRIMARY_KEYS_SQL, TABLES_SQL};
pub use connection::{PostgresConnection, PostgresTransaction};
pub use driver::PostgresDriver;
pub use tls::{SslMode, TlsError, build_tls_connector};
