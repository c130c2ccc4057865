//! Mangaba CLI - Database migrations and order management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! mangaba-cli migrate
//!
//! # Manually confirm an out-of-band payment (pix, boleto)
//! mangaba-cli orders confirm 7b0c3f06-1f3a-4a51-bc09-2d9de3524f1d --reference PIX-8841
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `orders confirm` - Mark an awaiting-payment order as paid

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "mangaba-cli")]
#[command(author, version, about = "Mangaba CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// Confirm an out-of-band payment and mark the order paid
    Confirm {
        /// Order ID (UUID)
        order_id: String,

        /// Payment reference to attach (e.g., a pix transaction code)
        #[arg(short, long)]
        reference: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Orders { action } => match action {
            OrdersAction::Confirm {
                order_id,
                reference,
            } => {
                commands::orders::confirm(&order_id, reference.as_deref()).await?;
            }
        },
    }
    Ok(())
}
