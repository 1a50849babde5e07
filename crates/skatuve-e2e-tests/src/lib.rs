use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use rand::Rng as _;
use reqwest::Url;
use skatuve_server::{
    config::{Parser, ServerConfig},
    run::run_graceful_with_state,
};
use tempfile::TempDir;
use tokio::sync::oneshot;
use tracing::info;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(3030..4030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

/// Server config with its own database in a fresh temporary directory.
pub fn test_config(test_name: &str, base_dir: &Path) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let database_url = format!("sqlite://{}/galleries.db", tmp_data_dir.path().display());
    let port = random_port()?.to_string();
    let args = &[
        "skatuve-e2e-tests",
        "--port",
        &port,
        "--database-url",
        &database_url,
    ];
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Same as [`test_config`] but without any database configured.
pub fn test_config_without_db() -> Result<ServerConfig> {
    let port = random_port()?.to_string();
    Ok(ServerConfig::try_parse_from([
        "skatuve-e2e-tests",
        "--port",
        &port,
    ])?)
}

pub fn prepare_env(test_name: &str) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir)
}

pub fn base_url(config: &ServerConfig) -> Result<Url> {
    Ok(Url::parse(&format!("http://127.0.0.1:{}/", config.port))?)
}

pub struct ServerGuard {
    shutdown: Option<oneshot::Sender<()>>,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

/// Starts the server in background and waits until it answers health checks.
pub async fn launch_env(config: ServerConfig) -> Result<(reqwest::Client, Url, ServerGuard)> {
    let base_url = base_url(&config)?;
    let state = skatuve_server::build_state(&config);
    let (tx, rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = rx.await;
        };
        if let Err(e) = run_graceful_with_state(config, state, shutdown).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    let health_url = base_url.join("health")?;
    for _ in 0..50 {
        if let Ok(response) = client.get(health_url.clone()).send().await {
            if response.status().is_success() {
                info!("Server ready at {base_url}");
                return Ok((
                    client,
                    base_url,
                    ServerGuard {
                        shutdown: Some(tx),
                    },
                ));
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start"))
}
