//! Connection and transaction traits

use async_trait::async_trait;

use crate::{CatalogIntrospection, QueryResult, Result, Value};

/// A live database session
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name
    fn driver_name(&self) -> &str;

    /// Execute a query that returns rows
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Begin a transaction in which the server rejects writes.
    ///
    /// Every query issued on this connection until the returned handle is
    /// committed or rolled back runs inside the transaction.
    async fn begin_read_only(&self) -> Result<Box<dyn Transaction>>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed, either by [`Connection::close`] or
    /// because the server ended the session
    fn is_closed(&self) -> bool;

    /// Get catalog introspection capabilities if the driver has them
    fn as_catalog(&self) -> Option<&dyn CatalogIntrospection> {
        None
    }
}

/// An open transaction on a [`Connection`]
#[async_trait]
pub trait Transaction: Send + Sync {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;

    /// Execute a query within the transaction
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Execute a query and keep at most `max_rows` rows.
    ///
    /// Drivers that stream results stop reading at the cap; the default
    /// reads everything and truncates.
    async fn query_capped(
        &self,
        sql: &str,
        params: &[Value],
        max_rows: usize,
    ) -> Result<QueryResult> {
        let mut result = self.query(sql, params).await?;
        result.rows.truncate(max_rows);
        Ok(result)
    }
}
