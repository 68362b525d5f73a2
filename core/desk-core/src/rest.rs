//! Blocking HTTP implementation of the remote service seams.
//!
//! Speaks the hosted service's REST dialect: one path segment per table,
//! filters as `column=op.value` query parameters, mutations as JSON bodies
//! with `Prefer` headers. Transport failures and non-2xx responses map onto
//! the crate's error taxonomy; the caller decides what failing means (the
//! activity cache, for one, fails closed on any error from here).

use crate::backend::TableBackend;
use crate::error::{DeskError, Result};
use crate::query::{Operation, OperationKind};
use crate::records::UserConfig;
use crate::status::StatusSource;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Table holding the per-user active flag. Deliberately outside the
/// protected set: status lookups must reach the service directly or the gate
/// would recurse into itself.
pub const STATUS_TABLE: &str = "user_config";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// REST client for the hosted table service.
pub struct RestBackend {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
    bearer: String,
}

impl RestBackend {
    /// `base_url` is the table endpoint root; the bearer token falls back to
    /// the API key for anonymous access.
    pub fn new(base_url: &str, api_key: &str, access_token: Option<&str>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(IO_TIMEOUT)
            .timeout_write(IO_TIMEOUT)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            bearer: format!("Bearer {}", access_token.unwrap_or(api_key)),
        }
    }

    fn endpoint(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }
}

impl TableBackend for RestBackend {
    fn execute(&self, op: &Operation) -> Result<Vec<Value>> {
        let url = self.endpoint(&op.table);
        let mut request = self
            .agent
            .request(method_for(op.kind), &url)
            .set("apikey", &self.api_key)
            .set("Authorization", &self.bearer)
            .set("Accept", "application/json");
        if let Some(prefer) = prefer_header(op.kind) {
            request = request.set("Prefer", prefer);
        }
        for (name, value) in query_params(op) {
            request = request.query(&name, &value);
        }

        tracing::debug!(table = %op.table, kind = op.kind.as_str(), "dispatching operation");
        let response = match &op.payload {
            Some(body) => request.send_json(body.clone()),
            None => request.call(),
        };
        match response {
            Ok(response) => rows_from_body(&read_body(response)?),
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(backend_error_from_body(status, &body))
            }
            Err(ureq::Error::Transport(transport)) => Err(DeskError::Http {
                context: format!("{} {}", op.kind.as_str(), op.table),
                details: transport.to_string(),
            }),
        }
    }
}

/// Status lookups over the same table dialect, bypassing the gate. Any
/// failure surfaces as `StatusLookupFailed`, which the activity cache
/// recovers from by failing closed.
pub struct RestStatusSource {
    backend: Arc<dyn TableBackend>,
}

impl RestStatusSource {
    pub fn new(backend: Arc<dyn TableBackend>) -> Self {
        Self { backend }
    }
}

impl StatusSource for RestStatusSource {
    fn fetch_active(&self, user_id: &str) -> Result<Option<bool>> {
        let mut op = Operation::new(STATUS_TABLE, OperationKind::Select);
        op.columns = Some("active".to_string());
        op.filters.push(crate::query::Filter {
            column: "id".to_string(),
            op: crate::query::Comparison::Eq,
            value: user_id.to_string(),
        });
        op.limit = Some(1);

        let rows = match self.backend.execute(&op) {
            Ok(rows) => rows,
            // The service reports "zero rows where one was expected" as an
            // error; for the gate that just means no status record.
            Err(DeskError::Backend {
                code: Some(code), ..
            }) if code == "PGRST116" => return Ok(None),
            Err(err) => {
                return Err(DeskError::StatusLookupFailed {
                    details: err.to_string(),
                })
            }
        };
        match rows.into_iter().next() {
            None => Ok(None),
            Some(row) => {
                let config: UserConfig =
                    serde_json::from_value(row).map_err(|err| DeskError::StatusLookupFailed {
                        details: err.to_string(),
                    })?;
                Ok(Some(config.active))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Request construction (pure, unit-tested)
// ─────────────────────────────────────────────────────────────────────────

fn method_for(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Select => "GET",
        OperationKind::Insert | OperationKind::Upsert => "POST",
        OperationKind::Update => "PATCH",
        OperationKind::Delete => "DELETE",
    }
}

fn prefer_header(kind: OperationKind) -> Option<&'static str> {
    match kind {
        OperationKind::Select => None,
        OperationKind::Insert | OperationKind::Update => Some("return=representation"),
        OperationKind::Upsert => Some("resolution=merge-duplicates,return=representation"),
        OperationKind::Delete => Some("return=representation"),
    }
}

fn query_params(op: &Operation) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if op.kind == OperationKind::Select {
        if let Some(columns) = &op.columns {
            params.push(("select".to_string(), columns.clone()));
        }
    }
    for filter in &op.filters {
        params.push((
            filter.column.clone(),
            format!("{}.{}", filter.op.as_str(), filter.value),
        ));
    }
    if let Some(order) = &op.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    if let Some(limit) = op.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

// ─────────────────────────────────────────────────────────────────────────
// Response handling
// ─────────────────────────────────────────────────────────────────────────

fn read_body(response: ureq::Response) -> Result<String> {
    response.into_string().map_err(|err| DeskError::Io {
        context: "Failed to read response body".to_string(),
        source: err,
    })
}

/// The service answers with a JSON array of rows; mutations with no
/// `return=representation` come back empty. A bare object is treated as a
/// single row.
fn rows_from_body(body: &str) -> Result<Vec<Value>> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(trimmed).map_err(|err| DeskError::Json {
        context: "Failed to parse response body".to_string(),
        source: err,
    })?;
    match value {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

/// Error payloads carry `{ "message": ..., "code": ... }` when the service
/// produced them; anything else degrades to the HTTP status line.
fn backend_error_from_body(status: u16, body: &str) -> DeskError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {status}"));
    let code = parsed
        .as_ref()
        .and_then(|v| v.get("code"))
        .and_then(Value::as_str)
        .map(str::to_string);
    DeskError::Backend { code, message }
}
