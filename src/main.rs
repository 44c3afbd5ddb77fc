//! Chat Admin - admin API for the Telegram chat bot
//!
//! Usage:
//!   DATABASE_PATH=./chat.db JWT_SECRET=... cargo run --bin chatadmin
//!   cargo run --bin chatadmin -- --port 8080      (flags without a subcommand go to `serve`)
//!   ADMIN_PASSWORD=... cargo run --bin chatadmin -- create-admin --email admin@example.com
//!   cargo run --bin chatadmin -- seed --users 5 --messages 10

use anyhow::{bail, Context, Result};
use chatadmin_backend::{
    auth::{models::is_valid_email, AdminStore},
    chats::{ChatRole, ChatStore, TelegramUser},
    config::{Config, DatabaseConfig},
    create_router, AppState,
};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::ffi::OsString;
use rand::{seq::SliceRandom, Rng};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "chatadmin")]
#[command(about = "Admin API for the Telegram chat bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default when no subcommand is given)
    Serve(Config),

    /// Register an administrator directly in the database
    CreateAdmin {
        #[command(flatten)]
        database: DatabaseConfig,

        #[arg(long)]
        email: String,

        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Set a new password for an existing administrator
    ChangePassword {
        #[command(flatten)]
        database: DatabaseConfig,

        #[arg(long)]
        email: String,

        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Insert demo users and chat transcripts
    Seed {
        #[command(flatten)]
        database: DatabaseConfig,

        #[arg(long, default_value = "5")]
        users: u32,

        #[arg(long, default_value = "10")]
        messages: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    init_tracing();

    let cli = Cli::parse_from(with_default_subcommand(std::env::args_os()));

    match cli.command {
        Command::Serve(config) => serve(config).await,
        Command::CreateAdmin {
            database,
            email,
            password,
        } => create_admin(&database, &email, &password),
        Command::ChangePassword {
            database,
            email,
            password,
        } => change_password(&database, &email, &password),
        Command::Seed {
            database,
            users,
            messages,
        } => seed(&database, users, messages),
    }
}

/// Insert `serve` when the first argument is a flag (or there is none), so
/// `chatadmin --port 8080` runs the server. Help and version flags pass through.
fn with_default_subcommand(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut args: Vec<OsString> = args.into_iter().collect();
    let needs_serve = match args.get(1).map(|arg| arg.to_str()) {
        None => true,
        Some(Some("-h" | "--help" | "-V" | "--version")) => false,
        Some(Some(first)) => first.starts_with('-'),
        Some(None) => false,
    };
    if needs_serve {
        let at = args.len().min(1);
        args.insert(at, OsString::from("serve"));
    }
    args
}

async fn serve(config: Config) -> Result<()> {
    info!("🚀 Chat Admin API starting");

    let state = AppState::from_config(&config)?;
    let app = create_router(state);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

fn create_admin(database: &DatabaseConfig, email: &str, password: &str) -> Result<()> {
    if !is_valid_email(email) {
        bail!("Not a valid email: {}", email);
    }
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let store = AdminStore::open(&database.path)?;
    let admin = store.register(email, password)?;
    info!("🔐 Admin {} ready ({} admins total)", admin.email, store.count()?);
    Ok(())
}

fn change_password(database: &DatabaseConfig, email: &str, password: &str) -> Result<()> {
    if password.is_empty() {
        bail!("Password must not be empty");
    }

    let store = AdminStore::open(&database.path)?;
    store.change_password(email, password)?;
    Ok(())
}

fn seed(database: &DatabaseConfig, users: u32, messages: u32) -> Result<()> {
    const NAMES: [&str; 8] = [
        "Alice", "Boris", "Chen", "Dasha", "Emil", "Fatima", "Gleb", "Hana",
    ];
    const PROMPTS: [&str; 4] = [
        "Hi! What can you do?",
        "Tell me something about myself.",
        "Can you describe my personality?",
        "Thanks, that was helpful.",
    ];
    const REPLIES: [&str; 4] = [
        "Hello! I can chat and help you reflect.",
        "From our conversation you seem curious.",
        "You come across as thoughtful and direct.",
        "Glad to help. Come back any time!",
    ];

    let store = ChatStore::open(&database.path)?;
    let mut rng = rand::thread_rng();
    let start = Utc::now() - Duration::days(i64::from(users));

    for i in 0..users {
        let tg_id: i64 = rng.gen_range(100_000_000..999_999_999);
        let first_name = NAMES.choose(&mut rng).copied().unwrap_or("User");
        let created_at = start + Duration::days(i64::from(i));

        store.upsert_user(&TelegramUser {
            tg_id,
            first_name: first_name.to_string(),
            username: rng
                .gen_bool(0.7)
                .then(|| format!("{}_{}", first_name.to_lowercase(), i)),
            created_at,
        })?;

        for m in 0..messages {
            let (role, pool) = if m % 2 == 0 {
                (ChatRole::User, &PROMPTS)
            } else {
                (ChatRole::Model, &REPLIES)
            };
            let text = pool.choose(&mut rng).copied().unwrap_or_default();
            let sent_at = created_at + Duration::minutes(i64::from(m));
            store.insert_chat(tg_id, role, text, sent_at)?;
        }
    }

    info!("🌱 Seeded {} users with {} messages each", users, messages);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chatadmin=debug,chatadmin_backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    // Missing .env is fine; real deployments set the variables directly
    let _ = dotenv();
}
