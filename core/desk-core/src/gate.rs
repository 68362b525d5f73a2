//! Activity-gated data client.
//!
//! `ProtectedClient` decorates a `TableBackend` without changing its call
//! shape: callers still take a table handle and chain filter calls as if
//! talking to the service directly. Handles for unprotected tables carry no
//! gate and behave identically to the bare backend. Handles for protected
//! tables attach the activity cache to every guarded operation; the check
//! runs at the builder's terminal step and a negative verdict means the
//! backend is never invoked.

use crate::backend::TableBackend;
use crate::query::{Operation, OperationKind, QueryBuilder};
use crate::status::ActivityCache;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

/// Tables whose operations require an active caller. Fixed at startup.
pub static PROTECTED_TABLES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["clients", "items", "orders", "order_items"].into_iter().collect());

/// Operation kinds subject to the activity check. Kinds outside this list
/// would pass through unguarded; the current service surface has no such
/// kinds, but membership stays explicit rather than assumed.
pub const GUARDED_OPERATIONS: [OperationKind; 5] = [
    OperationKind::Select,
    OperationKind::Insert,
    OperationKind::Update,
    OperationKind::Upsert,
    OperationKind::Delete,
];

pub fn is_guarded_operation(kind: OperationKind) -> bool {
    GUARDED_OPERATIONS.contains(&kind)
}

/// Decorator over the remote data service enforcing the activity invariant.
pub struct ProtectedClient {
    backend: Arc<dyn TableBackend>,
    gate: Arc<ActivityCache>,
    protected: HashSet<String>,
}

impl ProtectedClient {
    /// Wraps a backend with the default protected-table set.
    pub fn new(backend: Arc<dyn TableBackend>, gate: Arc<ActivityCache>) -> Self {
        Self::with_protected_tables(
            backend,
            gate,
            PROTECTED_TABLES.iter().map(|t| t.to_string()),
        )
    }

    /// Wraps a backend with an explicit protected-table set.
    pub fn with_protected_tables(
        backend: Arc<dyn TableBackend>,
        gate: Arc<ActivityCache>,
        tables: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            backend,
            gate,
            protected: tables.into_iter().collect(),
        }
    }

    /// Returns a handle for a table. Unprotected tables get an ungated
    /// handle, indistinguishable from talking to the backend directly.
    pub fn from(&self, table: &str) -> TableHandle {
        let gate = if self.protected.contains(table) {
            Some(Arc::clone(&self.gate))
        } else {
            None
        };
        TableHandle {
            backend: Arc::clone(&self.backend),
            table: table.to_string(),
            gate,
        }
    }

    pub fn is_protected(&self, table: &str) -> bool {
        self.protected.contains(table)
    }

    /// The shared activity cache backing this client's gate.
    pub fn activity(&self) -> &Arc<ActivityCache> {
        &self.gate
    }
}

/// Resource handle for one table, gated or not.
pub struct TableHandle {
    backend: Arc<dyn TableBackend>,
    table: String,
    gate: Option<Arc<ActivityCache>>,
}

impl TableHandle {
    pub fn is_gated(&self) -> bool {
        self.gate.is_some()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Starts a select with a column projection (`*` for all columns; the
    /// service's embedded-resource syntax passes through verbatim).
    pub fn select(&self, columns: &str) -> QueryBuilder {
        let mut op = Operation::new(&self.table, OperationKind::Select);
        op.columns = Some(columns.to_string());
        self.builder(op)
    }

    /// Starts an insert of one row or an array of rows.
    pub fn insert(&self, rows: Value) -> QueryBuilder {
        let mut op = Operation::new(&self.table, OperationKind::Insert);
        op.payload = Some(rows);
        self.builder(op)
    }

    /// Starts an update; chain filters to scope the affected rows.
    pub fn update(&self, changes: Value) -> QueryBuilder {
        let mut op = Operation::new(&self.table, OperationKind::Update);
        op.payload = Some(changes);
        self.builder(op)
    }

    /// Starts an upsert of one row or an array of rows.
    pub fn upsert(&self, rows: Value) -> QueryBuilder {
        let mut op = Operation::new(&self.table, OperationKind::Upsert);
        op.payload = Some(rows);
        self.builder(op)
    }

    /// Starts a delete; chain filters to scope the affected rows.
    pub fn delete(&self) -> QueryBuilder {
        self.builder(Operation::new(&self.table, OperationKind::Delete))
    }

    fn builder(&self, op: Operation) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.backend), self.gate.clone(), op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, SystemClock};
    use crate::error::{DeskError, Result};
    use crate::notify::Notifier;
    use crate::status::StatusSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // ========================================
    // Test doubles
    // ========================================

    /// Backend that records every operation it executes.
    struct RecordingBackend {
        executed: Mutex<Vec<Operation>>,
    }

    impl RecordingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                executed: Mutex::new(Vec::new()),
            })
        }

        fn executed(&self) -> Vec<Operation> {
            self.executed.lock().unwrap().clone()
        }
    }

    impl TableBackend for RecordingBackend {
        fn execute(&self, op: &Operation) -> Result<Vec<Value>> {
            self.executed.lock().unwrap().push(op.clone());
            Ok(Vec::new())
        }
    }

    struct FixedStatus {
        active: bool,
        calls: AtomicUsize,
    }

    impl FixedStatus {
        fn new(active: bool) -> Arc<Self> {
            Arc::new(Self {
                active,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl StatusSource for FixedStatus {
        fn fetch_active(&self, _user_id: &str) -> Result<Option<bool>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Some(self.active))
        }
    }

    fn client_with(
        backend: Arc<RecordingBackend>,
        status: Arc<FixedStatus>,
        notifier: Arc<Notifier>,
    ) -> ProtectedClient {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(ActivityCache::new(status, clock, notifier, "user-1"));
        ProtectedClient::new(backend, cache)
    }

    // ========================================
    // Passthrough behavior
    // ========================================

    #[test]
    fn unprotected_table_is_not_gated() {
        let backend = RecordingBackend::new();
        let status = FixedStatus::new(false);
        let client = client_with(Arc::clone(&backend), Arc::clone(&status), Arc::new(Notifier::new()));

        let handle = client.from("audit_log");
        assert!(!handle.is_gated());

        // Even with an inactive user the operation goes straight through and
        // the status source is never consulted.
        handle.delete().eq("id", "x").execute().unwrap();
        assert_eq!(backend.executed().len(), 1);
        assert_eq!(status.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn default_protected_set_covers_business_tables() {
        let backend = RecordingBackend::new();
        let client = client_with(backend, FixedStatus::new(true), Arc::new(Notifier::new()));

        for table in ["clients", "items", "orders", "order_items"] {
            assert!(client.is_protected(table), "{table} should be protected");
            assert!(client.from(table).is_gated());
        }
        assert!(!client.is_protected("user_config"));
    }

    #[test]
    fn custom_protected_set_is_honored() {
        let backend = RecordingBackend::new();
        let status = FixedStatus::new(true);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(ActivityCache::new(
            status,
            clock,
            Arc::new(Notifier::new()),
            "user-1",
        ));
        let client = ProtectedClient::with_protected_tables(
            backend,
            cache,
            ["invoices".to_string()],
        );

        assert!(client.from("invoices").is_gated());
        assert!(!client.from("clients").is_gated());
    }

    // ========================================
    // Gate behavior
    // ========================================

    #[test]
    fn inactive_user_blocks_delete_and_notifies() {
        // The delete never reaches the backend, the call rejects
        // with the distinguished error, and the notice fires with a message.
        let backend = RecordingBackend::new();
        let notifier = Arc::new(Notifier::new());
        let notices = Arc::new(Mutex::new(Vec::new()));

        let notices_clone = Arc::clone(&notices);
        notifier.subscribe(move |notice| {
            notices_clone.lock().unwrap().push(notice.message.clone());
        });

        let client = client_with(Arc::clone(&backend), FixedStatus::new(false), notifier);
        let err = client
            .from("orders")
            .delete()
            .eq("id", "order-9")
            .execute()
            .unwrap_err();

        assert!(matches!(err, DeskError::InactiveUser));
        assert!(backend.executed().is_empty(), "backend must never see the delete");

        let notices = notices.lock().unwrap();
        assert_eq!(notices.len(), 1);
        assert!(!notices[0].is_empty());
    }

    #[test]
    fn active_user_select_reaches_backend_with_all_filters() {
        // The backend receives the fully filtered operation exactly once.
        let backend = RecordingBackend::new();
        let client = client_with(Arc::clone(&backend), FixedStatus::new(true), Arc::new(Notifier::new()));

        client
            .from("clients")
            .select("*")
            .eq("owner_id", "u1")
            .order("name")
            .fetch()
            .unwrap();

        let executed = backend.executed();
        assert_eq!(executed.len(), 1);
        let op = &executed[0];
        assert_eq!(op.table, "clients");
        assert_eq!(op.kind, OperationKind::Select);
        assert_eq!(op.filters.len(), 1);
        assert_eq!(op.filters[0].column, "owner_id");
        assert_eq!(op.filters[0].value, "u1");
        assert_eq!(op.order.as_ref().unwrap().column, "name");
    }

    #[test]
    fn all_guarded_kinds_are_blocked_when_inactive() {
        let backend = RecordingBackend::new();
        let client = client_with(Arc::clone(&backend), FixedStatus::new(false), Arc::new(Notifier::new()));
        let handle = client.from("items");

        let attempts: Vec<Result<()>> = vec![
            handle.select("*").execute(),
            handle.insert(serde_json::json!({"name": "x"})).execute(),
            handle.update(serde_json::json!({"price": 1})).eq("id", "i1").execute(),
            handle.upsert(serde_json::json!({"id": "i1"})).execute(),
            handle.delete().eq("id", "i1").execute(),
        ];

        for attempt in attempts {
            assert!(matches!(attempt.unwrap_err(), DeskError::InactiveUser));
        }
        assert!(backend.executed().is_empty());
    }

    struct FailingBackend;

    impl TableBackend for FailingBackend {
        fn execute(&self, _op: &Operation) -> Result<Vec<Value>> {
            Err(DeskError::Backend {
                code: Some("23505".to_string()),
                message: "duplicate key".to_string(),
            })
        }
    }

    #[test]
    fn backend_errors_propagate_unwrapped_for_active_users() {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(ActivityCache::new(
            FixedStatus::new(true),
            clock,
            Arc::new(Notifier::new()),
            "user-1",
        ));
        let client = ProtectedClient::new(Arc::new(FailingBackend), cache);

        let err = client
            .from("items")
            .insert(serde_json::json!({"name": "dup"}))
            .execute()
            .unwrap_err();
        match err {
            DeskError::Backend { code, message } => {
                assert_eq!(code.as_deref(), Some("23505"));
                assert_eq!(message, "duplicate key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_matching_rows_is_not_an_activity_failure() {
        // Empty result sets are a success; the gate only decides whether the
        // operation may run at all.
        let backend = RecordingBackend::new();
        let client = client_with(backend, FixedStatus::new(true), Arc::new(Notifier::new()));

        let rows = client
            .from("orders")
            .select("*")
            .eq("owner_id", "nobody")
            .fetch()
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn chaining_on_gated_handle_matches_ungated_shape() {
        // The builder surface is the same with and without a gate.
        let backend = RecordingBackend::new();
        let client = client_with(Arc::clone(&backend), FixedStatus::new(true), Arc::new(Notifier::new()));

        let gated = client
            .from("orders")
            .select("total")
            .eq("owner_id", "u1")
            .gte("placed_at", "2026-08-01")
            .neq("status", "cancelled");
        let ungated = client
            .from("audit_log")
            .select("total")
            .eq("owner_id", "u1")
            .gte("placed_at", "2026-08-01")
            .neq("status", "cancelled");

        assert_eq!(gated.operation().filters, ungated.operation().filters);
        assert_eq!(gated.operation().columns, ungated.operation().columns);
    }

    #[test]
    fn every_operation_kind_is_guarded() {
        for kind in GUARDED_OPERATIONS {
            assert!(is_guarded_operation(kind));
        }
    }
}
