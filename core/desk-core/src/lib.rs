//! # desk-core
//!
//! Core library for orderdesk: gated data access and business logic shared
//! by all clients of the hosted table service.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime dependency. Clients can wrap with async if needed.
//! - **Fail closed**: Uncertainty about the caller's status means inactive.
//! - **Explicit seams**: The remote service, status source and clock are
//!   traits, so every policy is testable without a network.
//! - **Transparent gating**: Callers chain queries as if talking to the
//!   service directly; the activity check happens at dispatch.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use desk_core::{load_config, DeskEngine};
//!
//! let config = load_config()?;
//! let engine = DeskEngine::new(&config)?;
//! let orders = engine.list_orders()?;
//! ```

// Public modules
pub mod backend;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod notify;
pub mod query;
pub mod records;
pub mod rest;
pub mod session;
pub mod status;

// Re-export commonly used items at crate root
pub use backend::TableBackend;
pub use clock::{Clock, SystemClock};
pub use config::{load_config, save_config, DeskConfig};
pub use engine::{DashboardSummary, DeskEngine};
pub use error::{DeskError, Result};
pub use gate::{ProtectedClient, TableHandle, GUARDED_OPERATIONS, PROTECTED_TABLES};
pub use notify::{InactiveNotice, Notifier, SubscriptionId};
pub use query::{Comparison, Filter, Operation, OperationKind, OrderBy, QueryBuilder};
pub use records::{
    ClientRecord, ItemRecord, OrderItemRecord, OrderLine, OrderRecord, OrderStatus, UserConfig,
};
pub use rest::{RestBackend, RestStatusSource};
pub use session::Session;
pub use status::{ActivityCache, ActivityVerdict, StatusSource, VERDICT_TTL};
