//! Record store seam

use anyhow::Result;
use serde_json::Value;

/// CRUD surface of the remote record store, as used by the reconciler.
///
/// All calls are single atomic requests; there is no batching and no retry
/// at this layer. A failed call is reported to the caller, which decides
/// whether to degrade or count the failure.
pub trait RecordStore {
    /// List up to `limit` records of a table.
    async fn list(&self, table: &str, limit: u32) -> Result<Vec<Value>>;

    /// Create a record; returns the stored record (including its `sys_id`).
    async fn create(&self, table: &str, data: &Value) -> Result<Value>;

    /// Patch an existing record by opaque identifier.
    async fn update(&self, table: &str, sys_id: &str, data: &Value) -> Result<Value>;
}
