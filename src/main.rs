use anyhow::Context;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::load_settings;
use core_types::{Item, NewItem};
use database::{acquire_session, ensure_schema, ItemRepository, Session};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// The main entry point for the catalog tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Parse command-line arguments
    let cli = Cli::parse();

    let settings = load_settings(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    // Without a session there is nothing useful left to do.
    let session = acquire_session(&settings.database)
        .await
        .context("Failed to connect to the database")?;
    tracing::info!(database = %session.database(), "Successfully connected to database.");

    let outcome = run(cli.command, &session).await;
    session.close().await;
    outcome
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Stores and queries a small catalog of priced items in MySQL.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Missing files are ignored.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and the item table if they do not exist.
    Init,
    /// Add a single item.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, allow_negative_numbers = true)]
        price: i32,
    },
    /// Add several items in one statement, given as NAME=PRICE.
    AddBatch {
        #[arg(required = true, value_name = "NAME=PRICE")]
        items: Vec<NewItem>,
    },
    /// Print the price of the item with the given name.
    Price {
        #[arg(long)]
        name: String,
    },
    /// List items priced between --min and --max, inclusive.
    Range {
        #[arg(long, allow_negative_numbers = true)]
        min: i32,
        #[arg(long, allow_negative_numbers = true)]
        max: i32,
    },
    /// Run the sample sequence: one insert, one batch, one lookup, one range query.
    Demo,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run(command: Commands, session: &Session) -> anyhow::Result<()> {
    ensure_schema(session, &session.context())
        .await
        .context("Create item table failed")?;

    let repo = ItemRepository::new(session.clone());
    let ctx = session.context();

    match command {
        Commands::Init => {
            println!("Database '{}' is ready.", session.database());
        }
        Commands::Add { name, price } => {
            let id = repo
                .insert_one(&ctx, &NewItem::new(name, price))
                .await
                .context("Insert item failed")?;
            println!("Item with ID {id} created");
        }
        Commands::AddBatch { items } => {
            let rows = repo
                .insert_batch(&ctx, &items)
                .await
                .context("Multiple insert failed")?;
            println!("{rows} items created");
        }
        Commands::Price { name } => match repo.find_price_by_name(&ctx, &name).await {
            Ok(price) => println!("Price of {name} is {price}"),
            Err(e) if e.is_not_found() => println!("Item {name} not found"),
            Err(e) => return Err(e).context("Price lookup failed"),
        },
        Commands::Range { min, max } => {
            let items = repo
                .find_items_in_price_range(&ctx, min, max)
                .await
                .context("Selecting items by price failed")?;
            println!("{}", render_items(&items));
        }
        Commands::Demo => handle_demo(&repo, session).await,
    }

    Ok(())
}

/// Walks through every operation once. A failed step is logged and the next
/// one still runs.
async fn handle_demo(repo: &ItemRepository, session: &Session) {
    let iphone = NewItem::new("iphone", 950);
    match repo.insert_one(&session.context(), &iphone).await {
        Ok(id) => tracing::info!(id, "Inserted {}", iphone),
        Err(e) => tracing::error!(error = %e, "Insert item failed."),
    }

    let batch = [NewItem::new("Galaxy", 990), NewItem::new("iPad", 500)];
    match repo.insert_batch(&session.context(), &batch).await {
        Ok(rows) => tracing::info!(rows, "Inserted items simultaneously."),
        Err(e) => tracing::error!(error = %e, "Multiple insert failed."),
    }

    let name = "iphone";
    match repo.find_price_by_name(&session.context(), name).await {
        Ok(price) => tracing::info!("Price of {} is {}", name, price),
        Err(e) if e.is_not_found() => tracing::info!("Item {} not found in DB", name),
        Err(e) => tracing::error!(error = %e, "Fetching price failed."),
    }

    let (min, max) = (900, 1000);
    match repo.find_items_in_price_range(&session.context(), min, max).await {
        Ok(items) => {
            for item in &items {
                tracing::info!("Name: {} Price: {}", item.name, item.price);
            }
            println!("{}", render_items(&items));
        }
        Err(e) => tracing::error!(error = %e, "Selecting items by price failed."),
    }
}

fn render_items(items: &[Item]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Price", "Created"]);
    for item in items {
        table.add_row(vec![
            item.id.to_string(),
            item.name.clone(),
            item.price.to_string(),
            item.created_at.to_string(),
        ]);
    }
    table
}
