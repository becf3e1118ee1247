//! # Kervy Terminal Entry Point
//!
//! Headless command line for a Kervy POS terminal.
//!
//! ## Commands
//! ```text
//! kervy-terminal run                      watch connectivity, flush on reconnect (Ctrl-C stops)
//! kervy-terminal queue                    list writes waiting on this device
//! kervy-terminal flush                    replay the queue once
//! kervy-terminal sign-up --name Ana       create the account and its profile
//! kervy-terminal add-category Drinks      create (or queue) a category
//! kervy-terminal add-product ...          create (or queue) a product
//! kervy-terminal checkout --item p1:2 --cash 100
//! kervy-terminal kitchen --item p1:2
//! kervy-terminal transactions             sale history, newest first
//! ```
//!
//! Credentials come from `--email/--password` or `KERVY_EMAIL/KERVY_PASSWORD`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use kervy_core::{format_transaction_number, ImageSource, Money, NewCategory, NewProduct};
use kervy_print::{EscPosPrinter, PrinterDriver, RecordingPrinter};
use kervy_sync::SyncConfig;
use kervy_terminal_lib::commands::{checkout, sync};
use kervy_terminal_lib::state::ConfigState;
use kervy_terminal_lib::{init_tracing, AppContext, AppError, AppResult};

#[derive(Parser, Debug)]
#[command(name = "kervy-terminal", version, about = "Kervy POS terminal")]
struct Cli {
    /// Sync config file (defaults to the platform config dir's kervy.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    credentials: Credentials,

    /// Treat the network as down: creates are queued instead of written.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct Credentials {
    #[arg(long, env = "KERVY_EMAIL", global = true)]
    email: Option<String>,

    #[arg(long, env = "KERVY_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch connectivity and flush the offline queue on every reconnect.
    Run,
    /// List queued writes.
    Queue,
    /// Replay queued writes now.
    Flush,
    /// Create an account and its store profile.
    SignUp {
        #[arg(long)]
        name: Option<String>,
    },
    /// Create a category.
    AddCategory {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Create a product.
    AddProduct {
        name: String,
        /// Price, e.g. `45.50`.
        #[arg(long, value_parser = parse_money)]
        price: Money,
        #[arg(long, default_value_t = 0)]
        stock: i64,
        /// Category id.
        #[arg(long)]
        category: String,
        /// Local path, `file://` URI or an already hosted URL.
        #[arg(long)]
        image: Option<String>,
        #[arg(long, default_value = "")]
        description: String,
    },
    /// Sell the given items and print the receipt.
    Checkout {
        /// `PRODUCT_ID:QTY`, repeatable.
        #[arg(long = "item", value_parser = parse_item, required = true)]
        items: Vec<(String, i64)>,
        #[arg(long, value_parser = parse_money)]
        cash: Money,
        #[arg(long)]
        customer: Option<String>,
        /// Show the receipt instead of sending it to the printer.
        #[arg(long)]
        dry_run: bool,
    },
    /// Print a kitchen ticket for the given items.
    Kitchen {
        #[arg(long = "item", value_parser = parse_item, required = true)]
        items: Vec<(String, i64)>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show sale history.
    Transactions,
}

fn parse_money(input: &str) -> Result<Money, String> {
    Money::parse(input).ok_or_else(|| format!("not an amount: {input}"))
}

fn parse_item(input: &str) -> Result<(String, i64), String> {
    let (id, qty) = input
        .split_once(':')
        .ok_or_else(|| format!("expected PRODUCT_ID:QTY, got {input}"))?;
    let qty = qty
        .parse()
        .map_err(|_| format!("not a quantity: {qty}"))?;
    Ok((id.to_string(), qty))
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| AppError::internal(e.to_string()))?;
    println!("{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(code = ?e.code, "{}", e.message);
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let sync_config = SyncConfig::load(cli.config.clone())?;
    let context = AppContext::open(sync_config, ConfigState::from_env()).await?;
    if cli.offline {
        context.monitor.set_connected(false);
    }

    let result = dispatch(&context, cli).await;
    context.close().await;
    result
}

async fn sign_in(context: &AppContext, credentials: &Credentials) -> AppResult<()> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        return Err(AppError::validation(
            "--email and --password (or KERVY_EMAIL / KERVY_PASSWORD) are required",
        ));
    };
    context.session.sign_in(email, password).await?;
    Ok(())
}

async fn fill_cart(context: &AppContext, items: &[(String, i64)]) -> AppResult<()> {
    context.products.fetch().await?;
    for (id, qty) in items {
        let product = context.products.find(id).await?;
        context
            .cart
            .with_cart_mut(|cart| cart.add_item(&product, *qty))?;
    }
    Ok(())
}

async fn dispatch(context: &AppContext, cli: Cli) -> AppResult<()> {
    match cli.command {
        Command::Run => {
            sign_in(context, &cli.credentials).await?;
            let mut agent = context.sync_agent()?;
            let handle = agent.start().await?;
            info!("Running; press Ctrl-C to stop");

            tokio::signal::ctrl_c()
                .await
                .map_err(|e| AppError::internal(e.to_string()))?;

            let status = handle.status().await;
            info!(pending = status.pending, "Stopping");
            agent.shutdown().await?;
        }
        Command::Queue => {
            print_json(&sync::queued_writes(&context.queue).await?)?;
        }
        Command::Flush => {
            sign_in(context, &cli.credentials).await?;
            let report = sync::flush_queue(&context.flusher).await?;
            println!(
                "replayed {} (categories {}, products {}), still queued {}",
                report.replayed(),
                report.categories.replayed,
                report.products.replayed,
                report.retained()
            );
            if let Some(error) = report.error {
                println!("stopped early: {error}");
            }
        }
        Command::SignUp { name } => {
            let (Some(email), Some(password)) = (&cli.credentials.email, &cli.credentials.password)
            else {
                return Err(AppError::validation("--email and --password are required"));
            };
            let profile = context.session.sign_up(email, password, name).await?;
            print_json(&profile)?;
        }
        Command::AddCategory { name, description } => {
            sign_in(context, &cli.credentials).await?;
            let outcome = context
                .categories
                .add(NewCategory::new(name).with_description(description))
                .await?;
            print_json(&outcome)?;
        }
        Command::AddProduct {
            name,
            price,
            stock,
            category,
            image,
            description,
        } => {
            sign_in(context, &cli.credentials).await?;
            let outcome = context
                .products
                .add(NewProduct {
                    name,
                    description,
                    price_cents: price.cents(),
                    stock,
                    category_id: category,
                    image: image.map(ImageSource::new),
                })
                .await?;
            print_json(&outcome)?;
        }
        Command::Checkout {
            items,
            cash,
            customer,
            dry_run,
        } => {
            sign_in(context, &cli.credentials).await?;
            fill_cart(context, &items).await?;

            let mut recorder = RecordingPrinter::new();
            let mut escpos = EscPosPrinter::new();
            let printer: &mut dyn PrinterDriver = if dry_run { &mut recorder } else { &mut escpos };

            let outcome = checkout::checkout(context.till(), printer, cash, customer).await?;
            print_json(&outcome)?;
            if dry_run {
                println!("{}", recorder.rendered_text());
            }
        }
        Command::Kitchen {
            items,
            customer,
            dry_run,
        } => {
            sign_in(context, &cli.credentials).await?;
            fill_cart(context, &items).await?;

            let mut recorder = RecordingPrinter::new();
            let mut escpos = EscPosPrinter::new();
            let printer: &mut dyn PrinterDriver = if dry_run { &mut recorder } else { &mut escpos };

            let number = checkout::send_to_kitchen(context.till(), printer, customer).await?;
            println!("kitchen ticket #{}", format_transaction_number(number));
            if dry_run {
                println!("{}", recorder.rendered_text());
            }
        }
        Command::Transactions => {
            sign_in(context, &cli.credentials).await?;
            print_json(&context.transactions.fetch().await?)?;
        }
    }
    Ok(())
}
