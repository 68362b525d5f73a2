//! orderdesk: CLI client for the business desk.
//!
//! Every subcommand goes through the gated data client, so an inactive user
//! sees the same rejection the web screens would show.
//!
//! ## Subcommands
//!
//! - `client`: manage clients
//! - `item`: manage items and prices
//! - `order`: create orders, move them across the board, delete them
//! - `dashboard`: current-month totals
//! - `status`: show or refresh the activity verdict

mod commands;
mod logging;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "orderdesk")]
#[command(about = "Business desk for clients, items and orders")]
#[command(version)]
pub struct Cli {
    /// Override the signed-in user id from the config file
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage clients
    Client {
        #[command(subcommand)]
        action: ClientAction,
    },

    /// Manage items
    Item {
        #[command(subcommand)]
        action: ItemAction,
    },

    /// Manage orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },

    /// Current-month order count, revenue and table totals
    Dashboard,

    /// Show the cached activity verdict
    Status {
        /// Re-query the status source, bypassing the cache
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientAction {
    /// Create a client
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// List clients, ordered by name
    List,
    /// Delete a client
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum ItemAction {
    /// Create an item
    Add { name: String, price: f64 },
    /// List items, ordered by name
    List,
    /// Change an item's unit price
    SetPrice { id: String, price: f64 },
    /// Delete an item
    Rm { id: String },
}

#[derive(Subcommand)]
pub enum OrderAction {
    /// Create an order from line specs (item_id:quantity:unit_price)
    Create {
        #[arg(long)]
        client: String,
        #[arg(value_name = "LINE", required = true)]
        lines: Vec<String>,
    },
    /// List orders, newest first
    List,
    /// Move an order to a status (pending, in_progress, completed, cancelled)
    SetStatus { id: String, status: String },
    /// Step an order back to its previous status
    Revert { id: String },
    /// Delete an order and its lines
    Rm { id: String },
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        tracing::error!(error = %e, "orderdesk command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
