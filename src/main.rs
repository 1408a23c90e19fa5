use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use teloxide::Bot;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use subrelay::admin::{handler, AdminState};
use subrelay::cli::{Cli, Commands};
use subrelay::config::Config;
use subrelay::domain::{ChatId, RenderOptions, Renderer, SortMode, UserId};
use subrelay::errors::{RelayError, RelayResult};
use subrelay::logging;
use subrelay::messaging::{ConsoleMessenger, MessagingPort, TelegramMessenger};
use subrelay::services::{
    registry_worker, DeliveryService, FetchService, HealthBoard, PollService, PollSettings,
    RegistryService,
};
use subrelay::sources::RedditSource;
use subrelay::storage::{SqliteCursorRepository, SqliteSourceRepository, SqliteStorage};

/// Telegram long polling holds requests open for a while, so never go below this
const MIN_TELEGRAM_TIMEOUT: Duration = Duration::from_secs(17);

#[tokio::main]
async fn main() {
    logging::init("subrelay");

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize storage
    let storage = SqliteStorage::new(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path))?;

    match cli.command {
        Commands::Run { once, dry_run } => cmd_run(&config, storage, once, dry_run).await,
        Commands::Add {
            name,
            sort,
            skip_verify,
        } => cmd_add(&config, storage, &name, sort, skip_verify).await,
        Commands::Remove { name } => cmd_remove(&config, storage, &name),
        Commands::List => cmd_list(&config, storage),
        Commands::Reset { name } => cmd_reset(&config, storage, &name),
    }
}

fn registry(
    config: &Config,
    storage: SqliteStorage,
) -> RegistryService<SqliteSourceRepository, SqliteCursorRepository> {
    RegistryService::new(
        SqliteSourceRepository::new(storage.clone()),
        SqliteCursorRepository::new(storage),
        UserId(config.admin_id),
    )
}

fn build_bot(config: &Config) -> RelayResult<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(config.http_timeout.max(MIN_TELEGRAM_TIMEOUT))
        .build()
        .map_err(|e| RelayError::Messaging(format!("failed to build telegram client: {e}")))?;

    Ok(Bot::with_client(config.telegram_token.clone(), client))
}

async fn cmd_run(
    config: &Config,
    storage: SqliteStorage,
    once: bool,
    dry_run: bool,
) -> anyhow::Result<()> {
    let reddit = Arc::new(RedditSource::new(config)?);
    let health = HealthBoard::new();
    let shutdown = CancellationToken::new();

    let bot = if dry_run { None } else { Some(build_bot(config)?) };
    let messenger: Arc<dyn MessagingPort> = match &bot {
        Some(bot) => Arc::new(TelegramMessenger::new(bot.clone())),
        None => {
            println!("Running in dry-run mode: payloads are printed, cursors are not moved.\n");
            Arc::new(ConsoleMessenger::new())
        }
    };

    let poll = PollService::new(
        SqliteSourceRepository::new(storage.clone()),
        SqliteCursorRepository::new(storage.clone()),
        FetchService::new(reddit.clone(), config.fetch_limit),
        Renderer::new(RenderOptions {
            body_limit: config.body_limit,
            gallery_limit: config.gallery_limit,
        }),
        DeliveryService::new(messenger.clone(), reddit.clone(), config.video_max_bytes),
        ChatId(config.chat_id),
        PollSettings::from_config(config, dry_run),
        health.clone(),
    );

    if once {
        let report = poll.run_cycle(&shutdown).await?;
        println!(
            "Polled {} sources: {} delivered ({} as links), {} failed, {} skipped.",
            report.sources, report.delivered, report.fallbacks, report.failed, report.skipped
        );
        return Ok(());
    }

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown requested");
                signal_token.cancel();
            }
            Err(e) => warn!(error = %e, "could not listen for ctrl-c"),
        }
    });

    // The admin shell needs Telegram, so dry runs go without it
    let admin_task = match bot {
        Some(bot) => {
            let service = registry(config, storage)
                .with_provider(reddit.clone())
                .with_health(health);
            let (handle, _worker) = registry_worker::spawn(service);

            let state = Arc::new(AdminState {
                registry: handle,
                messenger,
                admin: UserId(config.admin_id),
                poll_interval: config.poll_interval,
            });
            Some(tokio::spawn(handler::run(bot, state, shutdown.clone())))
        }
        None => None,
    };

    info!(admin_id = config.admin_id, chat_id = config.chat_id, "relay started");
    poll.run(shutdown.clone()).await;

    if let Some(task) = admin_task {
        shutdown.cancel();
        task.await.context("admin shell task panicked")?;
    }

    Ok(())
}

async fn cmd_add(
    config: &Config,
    storage: SqliteStorage,
    name: &str,
    sort: SortMode,
    skip_verify: bool,
) -> anyhow::Result<()> {
    let mut service = registry(config, storage);
    if !skip_verify {
        println!("Checking {} on Reddit...", name);
        service = service.with_provider(Arc::new(RedditSource::new(config)?));
    }

    match service.add(UserId(config.admin_id), name, sort).await {
        Ok(source) => {
            println!("Subscribed to r/{} ({})", source.name, source.sort_mode);
            Ok(())
        }
        Err(RelayError::SourceAlreadyExists(name)) => {
            println!("Already subscribed to r/{}", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_remove(config: &Config, storage: SqliteStorage, name: &str) -> anyhow::Result<()> {
    let service = registry(config, storage);

    match service.remove(UserId(config.admin_id), name) {
        Ok(name) => {
            println!("Unsubscribed from r/{}", name);
            Ok(())
        }
        Err(RelayError::SourceNotRegistered(name)) => {
            println!("Not subscribed to r/{}", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_list(config: &Config, storage: SqliteStorage) -> anyhow::Result<()> {
    let service = registry(config, storage);
    let reports = service.status(UserId(config.admin_id))?;

    if reports.is_empty() {
        println!("No sources registered.");
        return Ok(());
    }

    println!("Subscribed subreddits:\n");
    for report in reports {
        println!("  r/{} [{}]", report.source.name, report.source.sort_mode);
        match report.cursor {
            Some(cursor) => println!(
                "    Last sent: {} ({})",
                cursor.last_item_id,
                cursor.last_seen_time.format("%Y-%m-%d %H:%M:%S UTC")
            ),
            None => println!("    Last sent: nothing yet"),
        }
        println!();
    }

    Ok(())
}

fn cmd_reset(config: &Config, storage: SqliteStorage, name: &str) -> anyhow::Result<()> {
    let service = registry(config, storage);

    match service.reset(UserId(config.admin_id), name) {
        Ok(name) => {
            println!("Reset r/{}. Recent posts will be sent on the next poll.", name);
            Ok(())
        }
        Err(RelayError::SourceNotRegistered(name)) => {
            println!("Not subscribed to r/{}", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
