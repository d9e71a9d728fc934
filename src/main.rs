use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use pix_watch::config::{load_config, validation::validate_config, WatchConfig};
use pix_watch::observability::{logging, metrics};
use pix_watch::payments::{CartSnapshot, OrderId, WatchEvent};
use pix_watch::storefront::{CartAction, CheckoutForm, SaleForm, SaleItem};
use pix_watch::CheckoutController;

#[derive(Parser)]
#[command(name = "pix-watch")]
#[command(about = "Submit storefront checkouts and watch their Pix payment status", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the storefront base URL.
    #[arg(short, long)]
    url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the payment status of an existing order
    Watch {
        order_id: String,
    },
    /// Finalize the session cart and watch the Pix payment
    Checkout(CheckoutArgs),
    /// Register a staff sale and watch the Pix payment
    Sale(SaleArgs),
    /// Mark a staff sale as paid
    MarkPaid {
        order_id: String,
    },
    /// Add a product to the session cart
    CartAdd {
        product_id: u64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change or remove a session cart line
    CartUpdate {
        product_id: u64,
        #[arg(value_enum)]
        action: CartActionArg,
        /// New quantity for `set`
        #[arg(short, long, required_if_eq("action", "set"))]
        quantity: Option<u32>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum CartActionArg {
    Inc,
    Dec,
    Set,
    Remove,
}

impl CartActionArg {
    fn into_action(self, quantity: Option<u32>) -> CartAction {
        match self {
            CartActionArg::Inc => CartAction::Increment,
            CartActionArg::Dec => CartAction::Decrement,
            CartActionArg::Set => CartAction::Set(quantity.unwrap_or(0)),
            CartActionArg::Remove => CartAction::Remove,
        }
    }
}

fn print_cart(cart: &CartSnapshot) {
    for line in &cart.items {
        println!("{} x{}  R$ {}", line.name, line.quantity, line.subtotal);
    }
    println!("{} item(s), total R$ {}", cart.count, cart.total);
}

#[derive(Args)]
struct CheckoutArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long, default_value = "")]
    last_name: String,
    #[arg(long)]
    whatsapp: String,
    #[arg(long, default_value = "pix")]
    payment_method: String,
}

#[derive(Args)]
struct SaleArgs {
    #[arg(long)]
    customer_name: String,
    #[arg(long, default_value = "")]
    whatsapp: String,
    #[arg(long, default_value = "pix")]
    payment_method: String,
    #[arg(long)]
    mark_paid_now: bool,
    /// Sale line as PRODUCT_ID:QUANTITY[:VARIANT_ID]; repeatable
    #[arg(long = "item", value_parser = parse_item, required = true)]
    items: Vec<SaleItem>,
}

fn parse_item(raw: &str) -> Result<SaleItem, String> {
    let mut parts = raw.split(':');
    let product_id = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| format!("invalid product id in '{}'", raw))?;
    let quantity = match parts.next() {
        Some(q) => q.parse().map_err(|_| format!("invalid quantity in '{}'", raw))?,
        None => 1,
    };
    let variant_id = match parts.next() {
        Some(v) => Some(v.parse().map_err(|_| format!("invalid variant id in '{}'", raw))?),
        None => None,
    };
    if parts.next().is_some() || quantity == 0 {
        return Err(format!("invalid item '{}'", raw));
    }
    Ok(SaleItem {
        product_id,
        variant_id,
        quantity,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => WatchConfig::default(),
    };
    if let Some(url) = cli.url {
        config.storefront.base_url = url;
        validate_config(&config).map_err(pix_watch::config::ConfigError::Validation)?;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        base_url = %config.storefront.base_url,
        poll_interval_ms = config.watcher.poll_interval_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&config, Arc::new(events_tx))?;

    match cli.command {
        Commands::Watch { order_id } => {
            controller.watcher().start(OrderId::new(order_id));
        }
        Commands::Checkout(args) => {
            let form = CheckoutForm {
                first_name: args.first_name,
                last_name: args.last_name,
                whatsapp: args.whatsapp,
                payment_method: args.payment_method,
            };
            let receipt = controller.submit_checkout(&form).await?;
            println!("{} Pedido #{}.", receipt.message, receipt.order_id);
            if let Ok(code) = controller.pix_code() {
                println!("Pix: {}", code);
            }
        }
        Commands::Sale(args) => {
            let form = SaleForm {
                customer_name: args.customer_name,
                whatsapp: args.whatsapp,
                payment_method: args.payment_method,
                mark_paid_now: args.mark_paid_now,
                items: args.items,
            };
            let receipt = controller.submit_sale(&form).await?;
            println!("{} Venda #{}: {}", receipt.message, receipt.order_id, receipt.status_label);
            if let Some(print_url) = &receipt.print_url {
                println!("Print: {}", print_url);
            }
            if let Ok(code) = controller.pix_code() {
                println!("Pix: {}", code);
            }
        }
        Commands::MarkPaid { order_id } => {
            let response = controller.client().mark_paid(&OrderId::new(order_id)).await?;
            println!("{}", response.message.unwrap_or_else(|| "Marked as paid.".to_string()));
            return Ok(());
        }
        Commands::CartAdd { product_id, quantity } => {
            print_cart(&controller.client().add_to_cart(product_id, quantity).await?);
            return Ok(());
        }
        Commands::CartUpdate { product_id, action, quantity } => {
            let action = action.into_action(quantity);
            print_cart(&controller.client().update_cart(product_id, action).await?);
            return Ok(());
        }
    }

    // A session that failed or was approved on its first check still has an
    // event queued for it.
    if controller.watcher().has_session() {
        follow(&controller, events_rx).await;
    }

    Ok(())
}

/// Print watcher events until the session ends or Ctrl-C closes the panel.
async fn follow(controller: &CheckoutController, mut events: mpsc::UnboundedReceiver<WatchEvent>) {
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(WatchEvent::StatusChanged(report)) => {
                    println!("#{}: {}", report.order_id, report.label);
                }
                Some(WatchEvent::Approved(approval)) => {
                    match &approval.summary {
                        Some(summary) => println!(
                            "Payment approved for order #{} ({}, {}, R$ {})",
                            approval.order_id, summary.customer_name, summary.contact, summary.total
                        ),
                        None => println!("Payment approved for order #{}", approval.order_id),
                    }
                    break;
                }
                Some(WatchEvent::Failed { order_id, message }) => {
                    eprintln!("Error watching order #{}: {}", order_id, message);
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, closing payment watch");
                controller.close();
                break;
            }
        }
    }
}
