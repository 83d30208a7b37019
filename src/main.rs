use std::sync::Arc;

use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;

use bayun::cli::{Cli, Commands};
use bayun::commands::built_in_handlers;
use bayun::core::metrics::init_metrics;
use bayun::core::{config, init_logger};
use bayun::dispatch::analyzers::built_in_analyzers;
use bayun::dispatch::{CommandRegistry, Dispatcher as DispatchEngine};
use bayun::storage::create_pool;
use bayun::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps, TelegramSink};

/// Main entry point for the Telegram bot
///
/// Parses CLI arguments and dispatches to the appropriate subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, database, bot creation).
#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse_args();

    // Set up global panic handler to catch panics in dispatcher
    // This allows us to log the panic and continue working instead of terminating
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
        if let Some(msg) = panic_info.payload().downcast_ref::<&str>() {
            log::error!("Panic message: {}", msg);
        }
    }));

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run) | None => run_bot().await,
        Some(Commands::Registry) => print_registry(),
    }
}

/// Run the bot in long polling mode
async fn run_bot() -> Result<()> {
    init_metrics();

    // Database pool
    let db_pool = Arc::new(
        create_pool(&config::DATABASE_PATH).map_err(|e| anyhow::anyhow!("Failed to create database pool: {}", e))?,
    );
    log::info!("Database ready at {}", *config::DATABASE_PATH);

    // Command registry: every localized spelling resolved once, at startup
    let registry = Arc::new(CommandRegistry::build(built_in_handlers()));

    // Bot instance
    let bot = create_bot()?;
    let bot_info = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    // Publish the command menu
    setup_bot_commands(&bot).await?;

    // The dispatch engine: registry + analyzers + the sink synthetic
    // responses are delivered through
    let sink = Arc::new(TelegramSink::new(bot.clone()));
    let engine = Arc::new(DispatchEngine::new(
        Arc::clone(&db_pool),
        registry,
        built_in_analyzers(),
        sink,
    ));

    let handler_deps = HandlerDeps::new(Arc::clone(&db_pool), engine);
    let handler = schema(handler_deps);

    log::info!("Starting bot in long polling mode");

    Dispatcher::builder(bot, handler)
        .dependencies(DependencyMap::new())
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// Print the built registry: canonical ids, spellings and required levels
fn print_registry() -> Result<()> {
    let registry = CommandRegistry::build(built_in_handlers());
    for spec in registry.commands() {
        println!(
            "{:<10} level={:<9} names: {}",
            spec.id.to_string(),
            spec.required_level.to_string(),
            spec.spellings.join(", ")
        );
    }
    Ok(())
}
