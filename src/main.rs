//! Lessonflow CLI - content server, publishing worker and admin tasks
//!
//! All commands share one content store given by `--database-url`.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use lessonflow_api::{middleware::role_to_db, ApiServer, ApiServerConfig};
use lessonflow_auth::{hash_password, validate_password_strength, Role};
use lessonflow_db::entities::user;
use lessonflow_publisher::{run_worker, Publisher, SystemClock, DEFAULT_TICK_INTERVAL};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use uuid::Uuid;

mod seed;

/// Lessonflow - manage, schedule and publish learning content
#[derive(Parser, Debug)]
#[command(name = "lessonflow")]
#[command(about = "Lessonflow - manage, schedule and publish learning content")]
#[command(version)]
struct Cli {
    /// Content store URL (postgres://... or sqlite://...)
    #[arg(
        long,
        global = true,
        env = "DATABASE_URL",
        default_value = "sqlite://./lessonflow.db?mode=rwc"
    )]
    database_url: String,

    /// Log filter, e.g. `info` or `lessonflow_publisher=debug,info`; RUST_LOG wins when set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the API and, unless disabled, the publishing worker
    Serve {
        /// Address to bind the API server
        #[arg(long, env = "LESSONFLOW_BIND", default_value = "127.0.0.1:8000")]
        bind: SocketAddr,

        /// Secret used to sign session tokens
        #[arg(long, env = "JWT_SECRET")]
        jwt_secret: String,

        /// Session token lifetime in minutes
        #[arg(long, env = "LESSONFLOW_TOKEN_TTL_MINUTES", default_value = "30")]
        token_ttl_minutes: i64,

        /// Allow public self-registration as viewer
        #[arg(long, env = "LESSONFLOW_ALLOW_SIGNUP")]
        allow_signup: bool,

        /// Allowed CORS origins (comma separated); localhost when omitted
        #[arg(long, env = "CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Option<Vec<String>>,

        /// Do not run the publishing worker in this process
        #[arg(long)]
        no_worker: bool,

        /// Seconds between publishing ticks
        #[arg(long, env = "LESSONFLOW_TICK_INTERVAL_SECS")]
        tick_interval_secs: Option<u64>,
    },

    /// Run only the publishing worker
    Worker {
        /// Seconds between publishing ticks
        #[arg(long, env = "LESSONFLOW_TICK_INTERVAL_SECS")]
        tick_interval_secs: Option<u64>,
    },

    /// Run a single publishing tick and print its summary as JSON
    Tick,

    /// Create a user account
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long, env = "LESSONFLOW_USER_PASSWORD")]
        password: String,

        /// admin, editor or viewer
        #[arg(long, default_value = "viewer")]
        role: Role,

        #[arg(long)]
        full_name: Option<String>,
    },

    /// Load demo users and content; existing rows are kept
    Seed,
}

/// Setup logging from RUST_LOG, falling back to the given filter
fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn open_store(database_url: &str) -> Result<DatabaseConnection> {
    let db = lessonflow_db::connect(database_url)
        .await
        .context("Failed to connect to the content store")?;
    lessonflow_db::migrate(&db)
        .await
        .context("Failed to run content store migrations")?;
    Ok(db)
}

fn tick_interval(secs: Option<u64>) -> Result<Duration> {
    match secs {
        Some(0) => bail!("--tick-interval-secs must be at least 1"),
        Some(secs) => Ok(Duration::from_secs(secs)),
        None => Ok(DEFAULT_TICK_INTERVAL),
    }
}

/// Flip `tx` on Ctrl+C
fn spawn_shutdown_signal(tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down...");
        let _ = tx.send(true);
    });
}

async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow() {
        if rx.changed().await.is_err() {
            return;
        }
    }
}

async fn create_user(
    db: &DatabaseConnection,
    email: &str,
    password: &str,
    role: Role,
    full_name: Option<String>,
) -> Result<user::Model> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        bail!("Invalid email address: {}", email);
    }
    validate_password_strength(password)?;

    let existing = user::Entity::find()
        .filter(user::Column::Email.eq(email.as_str()))
        .one(db)
        .await?;
    if existing.is_some() {
        bail!("A user with email {} already exists", email);
    }

    let now = Utc::now();
    let created = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(hash_password(password)?),
        full_name: Set(full_name),
        role: Set(role_to_db(role)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await
    .context("Failed to insert user")?;

    Ok(created)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Serve {
            bind,
            jwt_secret,
            token_ttl_minutes,
            allow_signup,
            cors_origins,
            no_worker,
            tick_interval_secs,
        } => {
            if token_ttl_minutes < 1 {
                bail!("--token-ttl-minutes must be at least 1");
            }
            let interval = tick_interval(tick_interval_secs)?;
            let db = open_store(&cli.database_url).await?;

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            spawn_shutdown_signal(shutdown_tx);

            let mut worker_task = None;
            let mut worker_health = None;
            if no_worker {
                warn!("Publishing worker disabled; scheduled lessons need a separate worker");
            } else {
                let publisher = Arc::new(Publisher::new(db.clone(), Arc::new(SystemClock)));
                worker_health = Some(publisher.health());
                worker_task = Some(tokio::spawn(run_worker(
                    publisher,
                    interval,
                    shutdown_rx.clone(),
                )));
            }

            let config = ApiServerConfig {
                bind_addr: bind,
                enable_cors: true,
                cors_origins,
                jwt_secret,
                token_ttl: chrono::Duration::minutes(token_ttl_minutes),
                allow_signup,
            };

            let server = ApiServer::new(config, db, worker_health);
            let result = server.start(wait_for_shutdown(shutdown_rx)).await;

            if let Some(task) = worker_task {
                if let Err(e) = task.await {
                    error!("Publishing worker task panicked: {}", e);
                }
            }

            result?;
            info!("Lessonflow stopped");
            Ok(())
        }

        Commands::Worker { tick_interval_secs } => {
            let interval = tick_interval(tick_interval_secs)?;
            let db = open_store(&cli.database_url).await?;

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            spawn_shutdown_signal(shutdown_tx);

            let publisher = Arc::new(Publisher::new(db, Arc::new(SystemClock)));
            run_worker(publisher, interval, shutdown_rx).await;

            info!("Publishing worker stopped");
            Ok(())
        }

        Commands::Tick => {
            let db = open_store(&cli.database_url).await?;
            let publisher = Publisher::new(db, Arc::new(SystemClock));

            let summary = publisher.tick().await.context("Publishing tick failed")?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }

        Commands::CreateUser {
            email,
            password,
            role,
            full_name,
        } => {
            let db = open_store(&cli.database_url).await?;
            let created = create_user(&db, &email, &password, role, full_name).await?;

            info!(user_id = %created.id, role = %role, "User created");
            println!("{}", created.id);
            Ok(())
        }

        Commands::Seed => {
            let db = open_store(&cli.database_url).await?;
            let summary = seed::seed_demo_content(&db, Utc::now()).await?;

            println!(
                "Seeded {} users, {} topics, {} programs, {} lessons",
                summary.users, summary.topics, summary.programs, summary.lessons
            );
            for (email, password, role) in seed::demo_credentials() {
                println!("  {:<6} {} / {}", role, email, password);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_serve() {
        let cli = Cli::try_parse_from([
            "lessonflow",
            "--database-url",
            "sqlite::memory:",
            "serve",
            "--jwt-secret",
            "s3cret",
            "--cors-origins",
            "http://a.test,http://b.test",
            "--tick-interval-secs",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Serve {
                cors_origins,
                tick_interval_secs,
                no_worker,
                ..
            } => {
                assert_eq!(
                    cors_origins,
                    Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
                );
                assert_eq!(tick_interval_secs, Some(5));
                assert!(!no_worker);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_seed() {
        let cli = Cli::try_parse_from(["lessonflow", "seed", "--database-url", "sqlite::memory:"]).unwrap();
        assert!(matches!(cli.command, Commands::Seed));
        assert_eq!(cli.database_url, "sqlite::memory:");
    }

    #[test]
    fn test_tick_interval_rejects_zero() {
        assert!(tick_interval(Some(0)).is_err());
        assert_eq!(tick_interval(None).unwrap(), DEFAULT_TICK_INTERVAL);
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicates() {
        let db = open_store("sqlite::memory:").await.unwrap();

        let created = create_user(&db, " Admin@Example.com", "long-enough", Role::Admin, None)
            .await
            .unwrap();
        assert_eq!(created.email, "admin@example.com");
        assert_eq!(created.role, user::UserRole::Admin);

        assert!(create_user(&db, "admin@example.com", "long-enough", Role::Viewer, None)
            .await
            .is_err());
        assert!(create_user(&db, "short@example.com", "short", Role::Viewer, None)
            .await
            .is_err());
    }
}
