use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use kestrel::commands;
use kestrel::config;
use kestrel::fetch::endpoints::EndpointPool;
use kestrel::fetch::rss::RssTimelineFetcher;
use kestrel::fetch::traits::{FetchError, SourceFetcher};
use kestrel::notify::telegram::TelegramNotifier;
use kestrel::scheduler::Poller;

/// Kestrel: watches social accounts and dispatches Telegram alerts.
///
/// Polls each watched account's timeline through mirror RSS endpoints,
/// filters new posts per subscriber, and delivers each match at most once.
#[derive(Parser)]
#[command(name = "kestrel", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// Start the polling loop
    Run,

    /// Force-check one source right now (useful for diagnostics)
    Check {
        /// The source handle to check (with or without '@')
        handle: String,
    },

    /// Show system status (DB stats, watched sources, cursors)
    Status,

    /// Subscribe a chat to a source
    Add {
        /// The source handle to watch
        handle: String,

        /// The subscriber's chat id
        #[arg(long)]
        chat: i64,

        /// Seed at the current cursor instead of replaying the fetch window
        #[arg(long)]
        from_now: bool,
    },

    /// Unsubscribe a chat from a source
    Remove {
        handle: String,

        #[arg(long)]
        chat: i64,
    },

    /// List a chat's subscriptions
    List {
        #[arg(long)]
        chat: i64,
    },

    /// Manage keyword filters
    Keyword {
        #[command(subcommand)]
        action: KeywordAction,
    },

    /// Flip a setting (reposts, quotes, replies, keywords_only, paused, telegram)
    Toggle {
        /// Setting name
        name: String,

        #[arg(long)]
        chat: i64,
    },

    /// Pause all alerts for a chat
    Pause {
        #[arg(long)]
        chat: i64,
    },

    /// Resume alerts for a chat
    Resume {
        #[arg(long)]
        chat: i64,
    },

    /// Prune old delivery records now
    Prune,
}

#[derive(Subcommand)]
enum KeywordAction {
    /// Add a keyword filter
    Add {
        pattern: String,

        #[arg(long)]
        chat: i64,

        /// Match case-sensitively
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Remove a keyword filter
    Remove {
        pattern: String,

        #[arg(long)]
        chat: i64,
    },

    /// List a chat's keywords
    List {
        #[arg(long)]
        chat: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("kestrel=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Commands::Init => {
            info!("Initializing kestrel database...");
            let db = kestrel::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext steps:");
            println!("  1. Set TELEGRAM_BOT_TOKEN in your .env");
            println!("  2. kestrel add <handle> --chat <id>");
            println!("  3. kestrel run");
        }

        Commands::Run => {
            config.require_telegram()?;
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let fetcher = Arc::new(RssTimelineFetcher::new()?);
            let notifier = Arc::new(TelegramNotifier::new(&config.telegram_bot_token)?);
            let poller = Poller::new(&config, db, fetcher, notifier);

            let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    let _ = shutdown_tx.send(true);
                }
            });

            println!("{}", "Kestrel is running. Ctrl-C to stop.".bold());
            poller.run(shutdown_rx).await?;
        }

        Commands::Check { handle } => {
            config.require_telegram()?;
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let fetcher = Arc::new(RssTimelineFetcher::new()?);
            let notifier = Arc::new(TelegramNotifier::new(&config.telegram_bot_token)?);
            let mut poller = Poller::new(&config, db, fetcher, notifier);

            let handle = commands::normalize_handle(&handle);
            println!("Checking @{handle}...");
            let delivered = poller.check_source(&handle).await?;
            println!("{} alerts delivered", delivered);
        }

        Commands::Status => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            kestrel::status::show(&db, &config.db_path, config.retention_days).await?;
        }

        Commands::Add {
            handle,
            chat,
            from_now,
        } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let handle = commands::add_subscription(db.as_ref(), chat, &handle, from_now).await?;
            println!("{} Now watching @{handle} for chat {chat}", "✓".green());

            // One probe fetch to surface an unknown source to the caller.
            // Not retried — a dead mirror just means we can't verify yet.
            match probe_source(&config, &handle).await {
                Ok(()) => {}
                Err(FetchError::UnknownSource(_)) => {
                    println!(
                        "{} @{handle} was not found upstream — check the spelling",
                        "!".yellow()
                    );
                }
                Err(e) => {
                    println!(
                        "{} Could not verify @{handle} ({e}); it will be checked next cycle",
                        "!".yellow()
                    );
                }
            }
        }

        Commands::Remove { handle, chat } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            if commands::remove_subscription(db.as_ref(), chat, &handle).await? {
                println!("{} Stopped watching @{}", "✓".green(), commands::normalize_handle(&handle));
            } else {
                println!("Chat {chat} wasn't watching @{}", commands::normalize_handle(&handle));
            }
        }

        Commands::List { chat } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let subscriptions = db.subscriptions_for(chat).await?;
            if subscriptions.is_empty() {
                println!("Chat {chat} has no subscriptions.");
            } else {
                println!("Subscriptions for chat {chat}:");
                for sub in subscriptions {
                    println!("  @{} (since {})", sub.source_handle, sub.created_at);
                }
            }
        }

        Commands::Keyword { action } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            match action {
                KeywordAction::Add {
                    pattern,
                    chat,
                    case_sensitive,
                } => {
                    if commands::add_keyword(db.as_ref(), chat, &pattern, case_sensitive).await? {
                        println!("{} Keyword added: {pattern}", "✓".green());
                    } else {
                        println!("Keyword already set: {pattern}");
                    }
                }
                KeywordAction::Remove { pattern, chat } => {
                    if commands::remove_keyword(db.as_ref(), chat, &pattern).await? {
                        println!("{} Keyword removed: {pattern}", "✓".green());
                    } else {
                        println!("Keyword not found: {pattern}");
                    }
                }
                KeywordAction::List { chat } => {
                    let keywords = db.keywords_for(chat).await?;
                    if keywords.is_empty() {
                        println!("Chat {chat} has no keywords.");
                    } else {
                        println!("Keywords for chat {chat}:");
                        for kw in keywords {
                            let case = if kw.case_sensitive {
                                " (case-sensitive)"
                            } else {
                                ""
                            };
                            println!("  {}{case}", kw.pattern);
                        }
                    }
                }
            }
        }

        Commands::Toggle { name, chat } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let (setting, value) = commands::toggle_setting(db.as_ref(), chat, &name).await?;
            let state = if value { "on".green() } else { "off".red() };
            println!("{setting} is now {state} for chat {chat}");
        }

        Commands::Pause { chat } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            commands::pause(db.as_ref(), chat).await?;
            println!("Alerts paused for chat {chat}. Resume with `kestrel resume --chat {chat}`.");
        }

        Commands::Resume { chat } => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            commands::resume(db.as_ref(), chat).await?;
            println!("Alerts resumed for chat {chat}.");
        }

        Commands::Prune => {
            let db = kestrel::db::open_sqlite(&config.db_path)?;
            let pruned = db.prune_deliveries(config.retention_days).await?;
            println!(
                "Pruned {pruned} delivery records older than {} days.",
                config.retention_days
            );
        }
    }

    Ok(())
}

/// Single verification fetch against the current endpoint.
async fn probe_source(config: &config::Config, handle: &str) -> Result<(), FetchError> {
    let fetcher = RssTimelineFetcher::new()?;
    let pool = EndpointPool::new(&config.endpoints);
    fetcher.fetch(pool.current(), handle, None, 1).await?;
    Ok(())
}
