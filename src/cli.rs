//! CLI argument parsing and startup helpers.

use clap::Parser;
use tracing::{error, info};

use crate::ServerConfig;
use crate::db::Database;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "snipbin", about = "Share short-lived text snippets behind a login")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "4000", env = "SNIPBIN_PORT")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, default_value = "snipbin.db", env = "SNIPBIN_DATABASE")]
    pub database: String,

    /// Directory of static assets served under /static
    #[arg(long, default_value = "./ui/static")]
    pub static_dir: String,

    /// Set the Secure flag on session cookies (enable when serving over HTTPS)
    #[arg(long, env = "SNIPBIN_SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: Args, db: Database) -> ServerConfig {
    ServerConfig {
        db,
        static_dir: args.static_dir,
        secure_cookies: args.secure_cookies,
    }
}
