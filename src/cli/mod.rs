//! CLI commands implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::warn;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{format_cents, CabinClass, PriceWatch, Trip, User};
use crate::repository::{
    migrations, AlertRepository, AsyncSqlitePool, SnapshotRepository, TripRepository,
    UserRepository, WatchRepository,
};
use crate::scrapers::browser::BrowserPool;
use crate::scrapers::{
    available_providers, MemoryRateLimitBackend, ProxyRotation, RateLimiter, ScraperEnv,
};
use crate::services::{AlertService, ScheduledScrapeService, ScrapeService};

#[derive(Parser)]
#[command(name = "fare")]
#[command(about = "Travel price tracking and alerting")]
#[command(version)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database
    Init,

    /// List available scraper providers
    Providers,

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage trips
    Trip {
        #[command(subcommand)]
        command: TripCommands,
    },

    /// Manage price watches
    Watch {
        #[command(subcommand)]
        command: WatchCommands,
    },

    /// Scrape current prices for a trip
    Scrape {
        user_id: Uuid,
        trip_id: Uuid,
        /// Provider to scrape
        #[arg(short, long)]
        provider: Option<String>,
        /// Cabin class (economy, premium_economy, business, first)
        #[arg(long, default_value = "economy")]
        cabin: String,
    },

    /// Show price history for a trip
    History {
        user_id: Uuid,
        trip_id: Uuid,
        /// Filter by provider
        #[arg(short, long)]
        provider: Option<String>,
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Scrape all trips with future departures and evaluate watches
    Sweep {
        /// Provider to scrape
        #[arg(short, long)]
        provider: Option<String>,
        /// Concurrent trips
        #[arg(short, long)]
        concurrency: Option<usize>,
    },

    /// Show alert history for a user
    Alerts {
        user_id: Uuid,
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Register a user
    Add { email: String, full_name: String },
}

#[derive(Subcommand)]
enum TripCommands {
    /// Create a trip
    Add {
        user_id: Uuid,
        /// Origin IATA code
        origin: String,
        /// Destination IATA code
        destination: String,
        /// Departure date (YYYY-MM-DD)
        departure: NaiveDate,
        /// Return date for round trips (YYYY-MM-DD)
        #[arg(short, long)]
        return_date: Option<NaiveDate>,
        #[arg(short, long, default_value = "1")]
        travelers: i32,
    },
}

#[derive(Subcommand)]
enum WatchCommands {
    /// Create a price watch on a trip
    Add {
        user_id: Uuid,
        trip_id: Uuid,
        /// Target price in dollars, e.g. 250 or 249.99
        target: String,
        #[arg(short, long, default_value = "google_flights")]
        provider: String,
        /// Hours to wait between alerts for this watch
        #[arg(long, default_value = "24")]
        cooldown_hours: i32,
    },

    /// Pause a watch
    Pause { watch_id: Uuid },

    /// Resume a watch
    Resume { watch_id: Uuid },
}

struct AppContext {
    config: AppConfig,
    pool: AsyncSqlitePool,
}

impl AppContext {
    async fn open(config: AppConfig) -> anyhow::Result<Self> {
        ensure_db_dir(&config.database_url)?;
        let pool = AsyncSqlitePool::new(&config.database_url);
        migrations::run(&pool).await?;
        Ok(Self { config, pool })
    }

    async fn scraper_env(&self) -> ScraperEnv {
        ScraperEnv::new(
            self.config.scraping.to_limits(),
            build_rate_limiter(&self.config).await,
            Arc::new(ProxyRotation::new(self.config.proxies.clone())),
            Arc::new(BrowserPool::new(self.config.browser.clone())),
        )
    }

    fn scrape_service(&self, env: ScraperEnv) -> ScrapeService {
        ScrapeService::new(
            TripRepository::new(self.pool.clone()),
            SnapshotRepository::new(self.pool.clone()),
            env,
        )
    }

    fn alert_service(&self) -> AlertService {
        AlertService::new(
            WatchRepository::new(self.pool.clone()),
            AlertRepository::new(self.pool.clone()),
            UserRepository::new(self.pool.clone()),
            TripRepository::new(self.pool.clone()),
        )
    }
}

fn ensure_db_dir(database_url: &str) -> anyhow::Result<()> {
    let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

async fn build_rate_limiter(config: &AppConfig) -> RateLimiter {
    #[cfg(feature = "redis-backend")]
    if let Some(url) = &config.redis_url {
        use crate::scrapers::rate_limit::RedisRateLimitBackend;
        match RedisRateLimitBackend::connect(url).await {
            Ok(backend) => return RateLimiter::new(Arc::new(backend)),
            Err(err) => {
                warn!(error = %err, "redis unavailable, falling back to in-memory rate limiting");
            }
        }
    }
    #[cfg(not(feature = "redis-backend"))]
    if config.redis_url.is_some() {
        warn!("redis support not compiled, using in-memory rate limiting");
    }
    RateLimiter::new(Arc::new(MemoryRateLimitBackend::new()))
}

fn parse_cabin(s: &str) -> anyhow::Result<CabinClass> {
    CabinClass::from_str(s)
        .ok_or_else(|| anyhow::anyhow!("unknown cabin class '{s}' (economy, premium_economy, business, first)"))
}

fn parse_target_price(s: &str) -> anyhow::Result<i64> {
    crate::scrapers::flights::parse::parse_price_cents(s)
        .ok_or_else(|| anyhow::anyhow!("invalid price '{s}', expected e.g. 250 or 249.99"))
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Init => {
            let ctx = AppContext::open(config).await?;
            println!("database ready at {}", ctx.config.database_url);
        }

        Commands::Providers => {
            for name in available_providers() {
                println!("{name}");
            }
        }

        Commands::User { command } => {
            let ctx = AppContext::open(config).await?;
            match command {
                UserCommands::Add { email, full_name } => {
                    let user = User::new(email, full_name);
                    UserRepository::new(ctx.pool.clone()).insert(&user).await?;
                    println!("user {} created", user.id);
                }
            }
        }

        Commands::Trip { command } => {
            let ctx = AppContext::open(config).await?;
            match command {
                TripCommands::Add {
                    user_id,
                    origin,
                    destination,
                    departure,
                    return_date,
                    travelers,
                } => {
                    let trip = Trip::new(
                        user_id,
                        origin.to_uppercase(),
                        destination.to_uppercase(),
                        departure,
                        return_date,
                        travelers,
                    );
                    TripRepository::new(ctx.pool.clone()).insert(&trip).await?;
                    println!("trip {} created ({} -> {})", trip.id, trip.origin, trip.destination);
                }
            }
        }

        Commands::Watch { command } => {
            let ctx = AppContext::open(config).await?;
            let repo = WatchRepository::new(ctx.pool.clone());
            match command {
                WatchCommands::Add {
                    user_id,
                    trip_id,
                    target,
                    provider,
                    cooldown_hours,
                } => {
                    let target_price = parse_target_price(&target)?;
                    let watch =
                        PriceWatch::new(user_id, trip_id, provider, target_price, cooldown_hours)?;
                    repo.insert(&watch).await?;
                    println!(
                        "watch {} created (target {})",
                        watch.id,
                        format_cents(watch.target_price)
                    );
                }
                WatchCommands::Pause { watch_id } => {
                    if repo.set_active(watch_id, false).await? {
                        println!("watch {watch_id} paused");
                    } else {
                        anyhow::bail!("watch {watch_id} not found");
                    }
                }
                WatchCommands::Resume { watch_id } => {
                    if repo.set_active(watch_id, true).await? {
                        println!("watch {watch_id} resumed");
                    } else {
                        anyhow::bail!("watch {watch_id} not found");
                    }
                }
            }
        }

        Commands::Scrape {
            user_id,
            trip_id,
            provider,
            cabin,
        } => {
            let ctx = AppContext::open(config).await?;
            let cabin = parse_cabin(&cabin)?;
            let provider = provider.unwrap_or_else(|| ctx.config.default_provider.clone());
            let env = ctx.scraper_env().await;
            let browser = Arc::clone(&env.browser);
            let service = ctx.scrape_service(env);

            let result = service.scrape_trip(trip_id, user_id, &provider, cabin).await;
            browser.shutdown().await;
            let snapshots = result?;

            println!("{} snapshot(s) stored", snapshots.len());
            for snap in &snapshots {
                println!(
                    "  {} {} {} ({})",
                    snap.provider,
                    format_cents(snap.price),
                    snap.airline.as_deref().unwrap_or("-"),
                    match snap.stops {
                        Some(0) => "nonstop".to_string(),
                        Some(n) => format!("{n} stop(s)"),
                        None => "stops unknown".to_string(),
                    },
                );
            }

            // Evaluate watches against what was just scraped
            let alerts = ctx
                .alert_service()
                .check_and_alert(trip_id, user_id, &snapshots)
                .await?;
            for alert in alerts {
                println!(
                    "  alert fired: {} at {} (target {})",
                    alert.id,
                    format_cents(alert.triggered_price),
                    format_cents(alert.target_price)
                );
            }
        }

        Commands::History {
            user_id,
            trip_id,
            provider,
            limit,
        } => {
            let ctx = AppContext::open(config).await?;
            let env = ctx.scraper_env().await;
            let service = ctx.scrape_service(env);
            let history = service
                .price_history(trip_id, user_id, provider.as_deref(), limit)
                .await?;
            for snap in history {
                println!(
                    "{}  {:>10}  {}  {}",
                    snap.scraped_at.format("%Y-%m-%d %H:%M"),
                    format_cents(snap.price),
                    snap.provider,
                    snap.airline.as_deref().unwrap_or("-"),
                );
            }
        }

        Commands::Sweep {
            provider,
            concurrency,
        } => {
            let ctx = AppContext::open(config).await?;
            let provider = provider.unwrap_or_else(|| ctx.config.default_provider.clone());
            let concurrency = concurrency.unwrap_or(ctx.config.sweep_concurrency);

            let env = ctx.scraper_env().await;
            let browser = Arc::clone(&env.browser);
            let service = ScheduledScrapeService::new(
                TripRepository::new(ctx.pool.clone()),
                ctx.scrape_service(env),
                ctx.alert_service(),
            );

            let summary = service.run_sweep(&provider, concurrency).await;
            browser.shutdown().await;

            println!(
                "swept {} trip(s): {} ok, {} failed, {} snapshot(s), {} alert(s)",
                summary.trips, summary.completed, summary.failed, summary.snapshots, summary.alerts
            );
        }

        Commands::Alerts { user_id, limit } => {
            let ctx = AppContext::open(config).await?;
            let alerts = ctx.alert_service().list_for_user(user_id, limit).await?;
            for alert in alerts {
                println!(
                    "{}  {:<7}  {} (target {})",
                    alert.created_at.format("%Y-%m-%d %H:%M"),
                    alert.status.as_str(),
                    format_cents(alert.triggered_price),
                    format_cents(alert.target_price),
                );
            }
        }
    }

    Ok(())
}
