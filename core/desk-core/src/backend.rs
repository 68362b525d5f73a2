//! Remote data service seam.
//!
//! The hosted backend is a black box behind this trait: table-scoped
//! operations in, `{ rows | error }` out. The gate and the engine only ever
//! talk to this seam, so tests swap in call-counting stubs and production
//! uses the REST implementation.

use crate::error::Result;
use crate::query::Operation;
use serde_json::Value;

/// Executes fully built table operations against the remote service.
pub trait TableBackend: Send + Sync {
    /// Runs one operation, returning the selected/affected rows. Errors from
    /// the service are propagated verbatim; this seam adds no wrapping.
    fn execute(&self, op: &Operation) -> Result<Vec<Value>>;
}
