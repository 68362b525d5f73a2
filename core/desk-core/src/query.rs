//! Query model and the chainable builder.
//!
//! Operations are represented explicitly: an `Operation` is built up by
//! chaining filter calls on a `QueryBuilder` and dispatched only at a
//! terminal step (`fetch`, `fetch_one`, `execute`). The terminal step is
//! where a gated builder consults the activity cache; chaining itself never
//! touches the network, so a fully filtered operation exists before anything
//! is sent.

use crate::backend::TableBackend;
use crate::error::{DeskError, Result};
use crate::gate::is_guarded_operation;
use crate::status::ActivityCache;
use serde_json::Value;
use std::sync::Arc;

/// The operation categories the remote data service exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Select => "select",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Upsert => "upsert",
            OperationKind::Delete => "delete",
        }
    }
}

/// Comparison operators accepted by the remote service's filter syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparison::Eq => "eq",
            Comparison::Neq => "neq",
            Comparison::Gt => "gt",
            Comparison::Gte => "gte",
            Comparison::Lt => "lt",
            Comparison::Lte => "lte",
        }
    }
}

/// One equality/comparison predicate on a column.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: Comparison,
    pub value: String,
}

/// Result ordering for selects.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

/// A fully described table operation, ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub table: String,
    pub kind: OperationKind,
    /// Column projection for selects (the service's embedded-resource syntax
    /// is passed through verbatim).
    pub columns: Option<String>,
    /// Row payload for insert/update/upsert.
    pub payload: Option<Value>,
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Operation {
    pub fn new(table: impl Into<String>, kind: OperationKind) -> Self {
        Self {
            table: table.into(),
            kind,
            columns: None,
            payload: None,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

/// Chainable call object for one operation.
///
/// Behaves identically whether or not a gate is attached; the gate is only
/// consulted when the operation actually dispatches.
pub struct QueryBuilder {
    backend: Arc<dyn TableBackend>,
    gate: Option<Arc<ActivityCache>>,
    op: Operation,
}

impl QueryBuilder {
    pub(crate) fn new(
        backend: Arc<dyn TableBackend>,
        gate: Option<Arc<ActivityCache>>,
        op: Operation,
    ) -> Self {
        Self { backend, gate, op }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Chaining (never dispatches)
    // ─────────────────────────────────────────────────────────────────────

    pub fn eq(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Eq, column, value)
    }

    pub fn neq(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Neq, column, value)
    }

    pub fn gt(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Gt, column, value)
    }

    pub fn gte(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Gte, column, value)
    }

    pub fn lt(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Lt, column, value)
    }

    pub fn lte(self, column: &str, value: impl ToString) -> Self {
        self.filter(Comparison::Lte, column, value)
    }

    fn filter(mut self, op: Comparison, column: &str, value: impl ToString) -> Self {
        self.op.filters.push(Filter {
            column: column.to_string(),
            op,
            value: value.to_string(),
        });
        self
    }

    /// Ascending order on a column.
    pub fn order(mut self, column: &str) -> Self {
        self.op.order = Some(OrderBy {
            column: column.to_string(),
            ascending: true,
        });
        self
    }

    /// Descending order on a column.
    pub fn order_desc(mut self, column: &str) -> Self {
        self.op.order = Some(OrderBy {
            column: column.to_string(),
            ascending: false,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.op.limit = Some(limit);
        self
    }

    /// The operation as built so far.
    pub fn operation(&self) -> &Operation {
        &self.op
    }

    // ─────────────────────────────────────────────────────────────────────
    // Terminal steps (dispatch, gate consulted here)
    // ─────────────────────────────────────────────────────────────────────

    /// Dispatches the operation and returns all rows.
    pub fn fetch(self) -> Result<Vec<Value>> {
        self.run()
    }

    /// Dispatches the operation and returns the single matching row.
    pub fn fetch_one(self) -> Result<Value> {
        let table = self.op.table.clone();
        let mut rows = self.run()?;
        if rows.is_empty() {
            return Err(DeskError::RowNotFound { table });
        }
        Ok(rows.remove(0))
    }

    /// Dispatches the operation, discarding any returned rows.
    pub fn execute(self) -> Result<()> {
        self.run().map(|_| ())
    }

    /// The activity check always completes before the backend sees the
    /// operation; a negative verdict means the backend never sees it at all.
    fn run(self) -> Result<Vec<Value>> {
        if let Some(gate) = &self.gate {
            if is_guarded_operation(self.op.kind) && !gate.check_activity() {
                tracing::debug!(
                    table = %self.op.table,
                    kind = self.op.kind.as_str(),
                    "operation rejected by activity gate"
                );
                return Err(DeskError::InactiveUser);
            }
        }
        self.backend.execute(&self.op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;

    impl TableBackend for NullBackend {
        fn execute(&self, _op: &Operation) -> Result<Vec<Value>> {
            Ok(Vec::new())
        }
    }

    fn builder(kind: OperationKind) -> QueryBuilder {
        QueryBuilder::new(Arc::new(NullBackend), None, Operation::new("clients", kind))
    }

    #[test]
    fn chained_filters_accumulate_in_order() {
        let b = builder(OperationKind::Select)
            .eq("owner_id", "u1")
            .gte("placed_at", "2026-08-01")
            .neq("status", "cancelled");

        let op = b.operation();
        assert_eq!(op.filters.len(), 3);
        assert_eq!(op.filters[0].column, "owner_id");
        assert_eq!(op.filters[0].op, Comparison::Eq);
        assert_eq!(op.filters[1].op, Comparison::Gte);
        assert_eq!(op.filters[2].value, "cancelled");
    }

    #[test]
    fn numeric_filter_values_are_stringified() {
        let b = builder(OperationKind::Select).gt("price", 10.5).lte("quantity", 3);
        let op = b.operation();
        assert_eq!(op.filters[0].value, "10.5");
        assert_eq!(op.filters[1].value, "3");
    }

    #[test]
    fn order_desc_overrides_order() {
        let b = builder(OperationKind::Select).order("name").order_desc("created_at");
        let order = b.operation().order.as_ref().unwrap();
        assert_eq!(order.column, "created_at");
        assert!(!order.ascending);
    }

    #[test]
    fn fetch_one_on_empty_result_is_row_not_found() {
        let err = builder(OperationKind::Select).fetch_one().unwrap_err();
        assert!(matches!(err, DeskError::RowNotFound { table } if table == "clients"));
    }

    #[test]
    fn operation_kind_names_match_service_verbs() {
        assert_eq!(OperationKind::Select.as_str(), "select");
        assert_eq!(OperationKind::Upsert.as_str(), "upsert");
        assert_eq!(Comparison::Neq.as_str(), "neq");
    }
}
