//! Command handlers.
//!
//! Builds one engine per invocation and keeps an inactive-notice observer
//! subscribed for the duration, printing the banner the web app would show
//! as a modal.

use crate::{Cli, ClientAction, Commands, ItemAction, OrderAction};
use desk_core::{load_config, DeskEngine, OrderLine, OrderStatus};

pub fn run(cli: Cli) -> Result<(), String> {
    let mut config = load_config()?;
    if let Some(user) = cli.user {
        config.user_id = Some(user);
    }
    let engine = DeskEngine::new(&config)?;

    // Held for the whole invocation; dropped with the engine at exit.
    let _banner = engine.subscribe_inactive(|notice| {
        eprintln!();
        eprintln!("*** {} ***", notice.message);
        eprintln!();
    });

    match cli.command {
        Commands::Client { action } => run_client(&engine, action),
        Commands::Item { action } => run_item(&engine, action),
        Commands::Order { action } => run_order(&engine, action),
        Commands::Dashboard => run_dashboard(&engine),
        Commands::Status { refresh } => run_status(&engine, refresh),
    }
}

fn run_client(engine: &DeskEngine, action: ClientAction) -> Result<(), String> {
    match action {
        ClientAction::Add { name, email, phone } => {
            let client = engine.create_client(&name, email.as_deref(), phone.as_deref())?;
            println!("Created client {} ({})", client.name, client.id);
        }
        ClientAction::List => {
            let clients = engine.list_clients()?;
            if clients.is_empty() {
                println!("No clients yet.");
            }
            for client in clients {
                println!(
                    "{}  {}  {}  {}",
                    client.id,
                    client.name,
                    client.email.as_deref().unwrap_or("-"),
                    client.phone.as_deref().unwrap_or("-"),
                );
            }
        }
        ClientAction::Rm { id } => {
            engine.delete_client(&id)?;
            println!("Deleted client {id}");
        }
    }
    Ok(())
}

fn run_item(engine: &DeskEngine, action: ItemAction) -> Result<(), String> {
    match action {
        ItemAction::Add { name, price } => {
            let item = engine.create_item(&name, price)?;
            println!("Created item {} ({}) at {:.2}", item.name, item.id, item.price);
        }
        ItemAction::List => {
            let items = engine.list_items()?;
            if items.is_empty() {
                println!("No items yet.");
            }
            for item in items {
                println!("{}  {}  {:.2}", item.id, item.name, item.price);
            }
        }
        ItemAction::SetPrice { id, price } => {
            let item = engine.set_item_price(&id, price)?;
            println!("{} now costs {:.2}", item.name, item.price);
        }
        ItemAction::Rm { id } => {
            engine.delete_item(&id)?;
            println!("Deleted item {id}");
        }
    }
    Ok(())
}

fn run_order(engine: &DeskEngine, action: OrderAction) -> Result<(), String> {
    match action {
        OrderAction::Create { client, lines } => {
            let lines = lines
                .iter()
                .map(|spec| parse_line(spec))
                .collect::<Result<Vec<_>, _>>()?;
            let order = engine.create_order(&client, &lines)?;
            println!("Created order {} totalling {:.2}", order.id, order.total);
        }
        OrderAction::List => {
            let orders = engine.list_orders()?;
            if orders.is_empty() {
                println!("No orders yet.");
            }
            for order in orders {
                let client_name = order
                    .client
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("-");
                let line_count = order.lines.as_ref().map(Vec::len).unwrap_or(0);
                println!(
                    "{}  {}  {}  {:.2}  {} line(s)",
                    order.id, order.status, client_name, order.total, line_count,
                );
            }
        }
        OrderAction::SetStatus { id, status } => {
            let status: OrderStatus = status.parse()?;
            engine.set_order_status(&id, status)?;
            println!("Order {id} is now {status}");
        }
        OrderAction::Revert { id } => match engine.revert_order_status(&id)? {
            Some(status) => println!("Order {id} went back to {status}"),
            None => println!("Order {id} is pending; nothing to revert."),
        },
        OrderAction::Rm { id } => {
            engine.delete_order(&id)?;
            println!("Deleted order {id}");
        }
    }
    Ok(())
}

fn run_dashboard(engine: &DeskEngine) -> Result<(), String> {
    let summary = engine.dashboard()?;
    println!("Orders this month:  {}", summary.order_count);
    println!("Revenue this month: {:.2}", summary.revenue);
    println!("Clients:            {}", summary.client_count);
    println!("Items:              {}", summary.item_count);
    Ok(())
}

fn run_status(engine: &DeskEngine, refresh: bool) -> Result<(), String> {
    let active = if refresh {
        engine.refresh_activity()
    } else {
        engine.check_activity()
    };
    match engine.last_activity_verdict() {
        Some(verdict) => println!(
            "{} (checked at {})",
            if active { "active" } else { "inactive" },
            verdict.checked_at.to_rfc3339(),
        ),
        None => println!("{}", if active { "active" } else { "inactive" }),
    }
    Ok(())
}

/// Parses an `item_id:quantity:unit_price` line spec.
fn parse_line(spec: &str) -> Result<OrderLine, String> {
    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() != 3 {
        return Err(format!(
            "Invalid line '{spec}': expected item_id:quantity:unit_price"
        ));
    }
    let quantity: u32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid quantity in '{spec}'"))?;
    let unit_price: f64 = parts[2]
        .parse()
        .map_err(|_| format!("Invalid unit price in '{spec}'"))?;
    Ok(OrderLine {
        item_id: parts[0].to_string(),
        quantity,
        unit_price,
    })
}
