use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use feedpin::feed::HttpFeedFetcher;
use feedpin::{
    notification, scheduler, Config, Database, DecayClock, DispatchSettings, Dispatcher,
    DryRunPoster, NotificationHandler, PostEvent, PostRepository, PostingService,
};

/// Capacity of the inbound post event queue.
const EVENT_QUEUE_SIZE: usize = 64;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };

    // Initialize logging
    if let Err(e) = feedpin::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedpin::logging::init_console_only(&config.logging.level);
    }

    info!("feedpin {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(config: Config) -> feedpin::Result<()> {
    let registry = config.validate()?;
    let timezone = config.timezone()?;
    info!(
        "{} feed(s), {} destination(s), timezone {}",
        registry.len(),
        config.destinations.len(),
        timezone
    );
    if !config.bot.posting_enabled {
        info!("Posting is disabled");
    }

    let db = Arc::new(Database::open(&config.database.path).await?);
    let posts = PostRepository::new(db.pool());
    info!(
        "{} post(s) recorded, {} featured",
        posts.count().await?,
        posts.count_featured().await?
    );

    let fetcher = Arc::new(HttpFeedFetcher::new(&config.fetch)?);
    let poster: Arc<dyn PostingService> = Arc::new(DryRunPoster::new());

    let dispatcher = Arc::new(Dispatcher::new(
        DispatchSettings::from_config(&config.bot),
        registry,
        config.destinations.clone(),
        db.clone(),
        fetcher,
        poster.clone(),
    ));
    let clock = Arc::new(DecayClock::new(db.clone(), poster.clone(), timezone));

    // No producer is wired yet: the dry-run poster reports no post events.
    // A publishing client would take a clone of `events` and send a
    // `PostEvent` for every post it observes. Holding the sender until
    // shutdown keeps the listener alive.
    let (events, events_rx) = mpsc::channel::<PostEvent>(EVENT_QUEUE_SIZE);
    let handler = NotificationHandler::new(db, poster, config.bot.username.clone());

    let poller = scheduler::start_poller(dispatcher, config.bot.poll_interval_mins);
    let decay = scheduler::start_decay_clock(clock, config.bot.day_check_interval_mins);
    let listener = notification::start_listener(handler, events_rx);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    drop(events);
    poller.abort();
    decay.abort();
    listener.abort();
    Ok(())
}
