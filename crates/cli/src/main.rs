//! Shopline CLI - terminal storefront.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the token is persisted for later runs)
//! shopline login -e ada@example.com -p secret
//!
//! # Browse
//! shopline products --category kitchen --search mug
//! shopline product 64f1c0ffee
//!
//! # Cart
//! shopline cart add 64f1c0ffee --quantity 2
//! shopline cart inc 64f1c0ffee
//! shopline cart show
//!
//! # Admin
//! shopline admin create-product --code SKU-9 --title Kettle --description "Steel kettle" \
//!     --price 25.50 --category kitchen --image kettle.png
//! ```
//!
//! # Environment Variables
//!
//! - `SHOPLINE_API_URL` - Backend base URL (required)
//! - `SHOPLINE_PASSWORD` - Password for `login`/`register` when `-p` is omitted
//! - `RUST_LOG` - Log filter (default `shopline_storefront=info,shopline_cli=info`)
//!
//! See `shopline_storefront::config` for the rest.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use shopline_storefront::{LogFormat, StorefrontConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod error;
mod output;

use error::CliError;

#[derive(Parser)]
#[command(name = "shopline")]
#[command(author, version, about = "Shopline terminal storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the access token
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "SHOPLINE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the persisted session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List products
    Products {
        /// Category name, or `all`
        #[arg(short, long)]
        category: Option<String>,

        /// Case-insensitive text to look for in title, description or category
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Product {
        /// Product id
        id: String,
    },
    /// List categories
    Categories,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Manage the catalog (admin only)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Set a product's quantity, adding it if absent
    Add {
        id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Increase a line's quantity
    Inc {
        id: String,

        #[arg(long, default_value_t = 1)]
        by: u32,
    },
    /// Decrease a line's quantity (never below one)
    Dec {
        id: String,

        #[arg(long, default_value_t = 1)]
        by: u32,
    },
    /// Remove a line
    Remove { id: String },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a product, uploading its image first
    CreateProduct {
        /// Admin-assigned product code
        #[arg(long)]
        code: String,

        #[arg(long)]
        title: String,

        #[arg(long)]
        description: String,

        /// Long-form body
        #[arg(long, default_value = "")]
        content: String,

        #[arg(long)]
        price: Decimal,

        #[arg(long)]
        category: String,

        /// Image file to upload
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Upload an image and print its URL
    Upload { path: PathBuf },
    /// Delete a product
    DeleteProduct { id: String },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopline_storefront=info,shopline_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    // Logs go to stderr so command output stays pipeable
    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
#[allow(clippy::print_stderr)]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing(config.log_format);

    match run(cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = %e, "Command failed");
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &StorefrontConfig) -> Result<(), CliError> {
    let store = shopline_storefront::Storefront::connect(config)?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&store, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
        } => commands::auth::register(&store, &name, &email, &password).await?,
        Commands::Logout => commands::auth::logout(&store).await,
        Commands::Whoami => commands::auth::whoami(&store).await,
        Commands::Products { category, search } => {
            commands::catalog::products(&store, category.as_deref(), search.as_deref()).await?;
        }
        Commands::Product { id } => commands::catalog::product(&store, &id).await?,
        Commands::Categories => commands::catalog::categories(&store).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&store).await?,
            CartAction::Add { id, quantity } => commands::cart::add(&store, &id, quantity).await?,
            CartAction::Inc { id, by } => {
                commands::cart::change(&store, &id, i64::from(by)).await?;
            }
            CartAction::Dec { id, by } => {
                commands::cart::change(&store, &id, -i64::from(by)).await?;
            }
            CartAction::Remove { id } => commands::cart::remove(&store, &id).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::CreateProduct {
                code,
                title,
                description,
                content,
                price,
                category,
                image,
            } => {
                let draft = shopline_storefront::ProductDraft {
                    product_code: code,
                    title,
                    description,
                    content,
                    price,
                    category,
                };
                commands::admin::create_product(&store, &draft, image.as_deref()).await?;
            }
            AdminAction::Upload { path } => commands::admin::upload(&store, &path).await?,
            AdminAction::DeleteProduct { id } => {
                commands::admin::delete_product(&store, &id).await?;
            }
        },
    }
    Ok(())
}
