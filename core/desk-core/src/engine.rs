//! High-level business operations.
//!
//! `DeskEngine` owns the wired-up stack (backend, activity cache, notifier,
//! clock) and exposes the operations the screens perform: client/item/order
//! CRUD, order status transitions, and the dashboard rollup. Every call goes
//! through the protected client, so the activity gate is enforced uniformly
//! without the callers knowing it exists.

use crate::backend::TableBackend;
use crate::clock::{Clock, SystemClock};
use crate::config::DeskConfig;
use crate::error::{DeskError, Result};
use crate::gate::ProtectedClient;
use crate::notify::{InactiveNotice, Notifier, SubscriptionId};
use crate::records::{ClientRecord, ItemRecord, OrderLine, OrderRecord, OrderStatus};
use crate::rest::{RestBackend, RestStatusSource};
use crate::session::Session;
use crate::status::{ActivityCache, ActivityVerdict, StatusSource};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Projection used when listing orders: the order row plus the client's
/// contact fields and each line with its item name.
const ORDER_LIST_COLUMNS: &str =
    "*,clients(name,email,phone),order_items(quantity,unit_price,subtotal,items(name))";

/// Current-month figures for the dashboard cards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DashboardSummary {
    pub order_count: usize,
    pub revenue: f64,
    pub client_count: usize,
    pub item_count: usize,
}

pub struct DeskEngine {
    client: ProtectedClient,
    session: Session,
    notifier: Arc<Notifier>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DeskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskEngine")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl DeskEngine {
    /// Wires up the production stack from connection settings.
    pub fn new(config: &DeskConfig) -> Result<Self> {
        if config.service_url.trim().is_empty() {
            return Err(DeskError::ConfigMissing("service_url"));
        }
        let user_id = config
            .user_id
            .clone()
            .ok_or(DeskError::ConfigMissing("user_id"))?;
        let backend: Arc<dyn TableBackend> = Arc::new(RestBackend::new(
            &config.service_url,
            &config.api_key,
            config.access_token.as_deref(),
        ));
        let status = Arc::new(RestStatusSource::new(Arc::clone(&backend)));
        Ok(Self::assemble(
            backend,
            status,
            Arc::new(SystemClock),
            Session::new(user_id),
        ))
    }

    /// Assembles an engine from explicit parts. Used by tests and by
    /// embedders that bring their own backend.
    pub fn with_parts(
        backend: Arc<dyn TableBackend>,
        status: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
        session: Session,
    ) -> Self {
        Self::assemble(backend, status, clock, session)
    }

    fn assemble(
        backend: Arc<dyn TableBackend>,
        status: Arc<dyn StatusSource>,
        clock: Arc<dyn Clock>,
        session: Session,
    ) -> Self {
        let notifier = Arc::new(Notifier::new());
        let cache = Arc::new(ActivityCache::new(
            status,
            Arc::clone(&clock),
            Arc::clone(&notifier),
            session.user_id.clone(),
        ));
        let client = ProtectedClient::new(backend, cache);
        Self {
            client,
            session,
            notifier,
            clock,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The gated data client, for callers composing their own queries.
    pub fn client(&self) -> &ProtectedClient {
        &self.client
    }

    // ─────────────────────────────────────────────────────────────────────
    // Activity
    // ─────────────────────────────────────────────────────────────────────

    pub fn subscribe_inactive(
        &self,
        callback: impl Fn(&InactiveNotice) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe_inactive(&self, id: SubscriptionId) {
        self.notifier.unsubscribe(id);
    }

    pub fn check_activity(&self) -> bool {
        self.client.activity().check_activity()
    }

    /// Forces a fresh status query, bypassing the TTL.
    pub fn refresh_activity(&self) -> bool {
        self.client.activity().refresh()
    }

    pub fn last_activity_verdict(&self) -> Option<ActivityVerdict> {
        self.client.activity().last_verdict()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Clients
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_client(
        &self,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<ClientRecord> {
        let rows = self
            .client
            .from("clients")
            .insert(json!([{
                "name": name,
                "email": email,
                "phone": phone,
                "owner_id": self.session.user_id,
            }]))
            .fetch()?;
        parse_first(rows, "clients")
    }

    pub fn list_clients(&self) -> Result<Vec<ClientRecord>> {
        let rows = self
            .client
            .from("clients")
            .select("*")
            .eq("owner_id", &self.session.user_id)
            .order("name")
            .fetch()?;
        parse_rows(rows, "clients")
    }

    pub fn delete_client(&self, client_id: &str) -> Result<()> {
        self.client
            .from("clients")
            .delete()
            .eq("id", client_id)
            .eq("owner_id", &self.session.user_id)
            .execute()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Items
    // ─────────────────────────────────────────────────────────────────────

    pub fn create_item(&self, name: &str, price: f64) -> Result<ItemRecord> {
        let rows = self
            .client
            .from("items")
            .insert(json!([{
                "name": name,
                "price": price,
                "owner_id": self.session.user_id,
            }]))
            .fetch()?;
        parse_first(rows, "items")
    }

    pub fn list_items(&self) -> Result<Vec<ItemRecord>> {
        let rows = self
            .client
            .from("items")
            .select("*")
            .eq("owner_id", &self.session.user_id)
            .order("name")
            .fetch()?;
        parse_rows(rows, "items")
    }

    pub fn set_item_price(&self, item_id: &str, price: f64) -> Result<ItemRecord> {
        let rows = self
            .client
            .from("items")
            .update(json!({ "price": price }))
            .eq("id", item_id)
            .eq("owner_id", &self.session.user_id)
            .fetch()?;
        parse_first(rows, "items")
    }

    pub fn delete_item(&self, item_id: &str) -> Result<()> {
        self.client
            .from("items")
            .delete()
            .eq("id", item_id)
            .eq("owner_id", &self.session.user_id)
            .execute()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Orders
    // ─────────────────────────────────────────────────────────────────────

    /// Creates the order row, then its line rows. Totals are computed here;
    /// the service stores what it is given.
    pub fn create_order(&self, client_id: &str, lines: &[OrderLine]) -> Result<OrderRecord> {
        if lines.is_empty() {
            return Err(DeskError::EmptyOrder);
        }
        let total: f64 = lines.iter().map(OrderLine::subtotal).sum();
        let placed_at = self.clock.now().to_rfc3339();

        let rows = self
            .client
            .from("orders")
            .insert(json!([{
                "client_id": client_id,
                "owner_id": self.session.user_id,
                "status": OrderStatus::Pending.as_str(),
                "total": total,
                "placed_at": placed_at,
            }]))
            .fetch()?;
        let order: OrderRecord = parse_first(rows, "orders")?;

        let line_rows: Vec<Value> = lines
            .iter()
            .map(|line| {
                json!({
                    "order_id": order.id,
                    "item_id": line.item_id,
                    "quantity": line.quantity,
                    "unit_price": line.unit_price,
                    "subtotal": line.subtotal(),
                })
            })
            .collect();
        self.client
            .from("order_items")
            .insert(Value::Array(line_rows))
            .execute()?;

        tracing::debug!(order_id = %order.id, lines = lines.len(), total, "order created");
        Ok(order)
    }

    /// Orders with embedded client and line details, newest first.
    pub fn list_orders(&self) -> Result<Vec<OrderRecord>> {
        let rows = self
            .client
            .from("orders")
            .select(ORDER_LIST_COLUMNS)
            .eq("owner_id", &self.session.user_id)
            .order_desc("created_at")
            .fetch()?;
        parse_rows(rows, "orders")
    }

    pub fn set_order_status(&self, order_id: &str, status: OrderStatus) -> Result<()> {
        self.client
            .from("orders")
            .update(json!({ "status": status.as_str() }))
            .eq("id", order_id)
            .eq("owner_id", &self.session.user_id)
            .execute()
    }

    /// Steps an order back to its previous status. Returns the new status,
    /// or `None` when the order is pending and has nothing before it.
    pub fn revert_order_status(&self, order_id: &str) -> Result<Option<OrderStatus>> {
        let row = self
            .client
            .from("orders")
            .select("status")
            .eq("id", order_id)
            .eq("owner_id", &self.session.user_id)
            .limit(1)
            .fetch_one()?;
        let current: OrderStatus = row
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse()?;

        match current.previous() {
            None => Ok(None),
            Some(previous) => {
                self.set_order_status(order_id, previous)?;
                Ok(Some(previous))
            }
        }
    }

    /// Deletes an order's line rows first, then the order row itself.
    pub fn delete_order(&self, order_id: &str) -> Result<()> {
        self.client
            .from("order_items")
            .delete()
            .eq("order_id", order_id)
            .execute()?;
        self.client
            .from("orders")
            .delete()
            .eq("id", order_id)
            .eq("owner_id", &self.session.user_id)
            .execute()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────

    /// Current-month order count and revenue (cancelled orders excluded),
    /// plus total client and item counts.
    pub fn dashboard(&self) -> Result<DashboardSummary> {
        let month_start = month_start_iso(self.clock.now());
        let orders = self
            .client
            .from("orders")
            .select("total,placed_at")
            .eq("owner_id", &self.session.user_id)
            .gte("placed_at", &month_start)
            .neq("status", OrderStatus::Cancelled.as_str())
            .fetch()?;

        let revenue = orders
            .iter()
            .filter_map(|row| row.get("total"))
            .map(numeric)
            .sum();
        let order_count = orders.len();

        let client_count = self
            .client
            .from("clients")
            .select("id")
            .eq("owner_id", &self.session.user_id)
            .fetch()?
            .len();
        let item_count = self
            .client
            .from("items")
            .select("id")
            .eq("owner_id", &self.session.user_id)
            .fetch()?
            .len();

        Ok(DashboardSummary {
            order_count,
            revenue,
            client_count,
            item_count,
        })
    }
}

/// Midnight UTC on the first day of `now`'s month, as ISO 8601.
fn month_start_iso(now: DateTime<Utc>) -> String {
    let date = now.date_naive().with_day(1).unwrap_or_else(|| now.date_naive());
    date.and_time(NaiveTime::MIN).and_utc().to_rfc3339()
}

/// Numeric columns may arrive as JSON numbers or as strings depending on the
/// column's declared precision; accept both.
fn numeric(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn parse_rows<T: DeserializeOwned>(rows: Vec<Value>, table: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(row).map_err(|err| DeskError::Json {
                context: format!("Failed to parse {table} row"),
                source: err,
            })
        })
        .collect()
}

fn parse_first<T: DeserializeOwned>(rows: Vec<Value>, table: &str) -> Result<T> {
    let mut rows = rows;
    if rows.is_empty() {
        return Err(DeskError::RowNotFound {
            table: table.to_string(),
        });
    }
    serde_json::from_value(rows.remove(0)).map_err(|err| DeskError::Json {
        context: format!("Failed to parse {table} row"),
        source: err,
    })
}
