use std::{path::PathBuf, time::Duration};

use crate::error::Result;
pub use clap::Parser;
use skatuve_app::state::AppConfig;
use skatuve_dal::DbConfig;

#[derive(Debug, Clone, clap::Parser)]
pub struct ServerConfig {
    #[arg(
        short,
        long,
        default_value_t = 3000,
        env = "SKATUVE_LISTEN_PORT",
        help = "Port to listen on"
    )]
    pub port: u16,
    #[arg(
        short,
        long,
        default_value = "127.0.0.1",
        env = "SKATUVE_LISTEN_ADDRESS",
        help = "Address to listen on"
    )]
    pub listen_address: String,

    #[arg(
        long,
        env = "SKATUVE_DATABASE_URL",
        help = "Database URL e.g. sqlite://galleries.db, requests fail with a configuration error when not set"
    )]
    pub database_url: Option<String>,

    #[arg(
        long,
        env = "SKATUVE_DB_MAX_CONNECTIONS",
        default_value_t = 10,
        help = "Maximum number of pooled database connections"
    )]
    pub max_connections: u32,

    #[arg(
        long,
        env = "SKATUVE_DB_CONNECT_TIMEOUT",
        default_value = "5s",
        help = "Database connect timeout in human friendly format (e.g. 5s, 1m)",
        value_parser = humantime::parse_duration
    )]
    pub connect_timeout: Duration,

    #[arg(
        long,
        env = "SKATUVE_STATIC_DIR",
        help = "Directory with the built frontend, served for all non API paths"
    )]
    pub static_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "SKATUVE_BODY_LIMIT_KB",
        default_value_t = 1024,
        help = "Maximum request body size in KB"
    )]
    pub body_limit_kb: usize,
}

impl ServerConfig {
    pub fn load() -> Result<Self> {
        ServerConfig::try_parse().map_err(|e| e.into())
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig {
            url: self.database_url.clone(),
            max_connections: self.max_connections,
            connect_timeout: self.connect_timeout,
        }
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            body_limit_kb: self.body_limit_kb,
        }
    }
}
