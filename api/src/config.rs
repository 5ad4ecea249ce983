use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Process configuration, read once at startup. Roles are explicit: any
/// number of processes may enable the scheduler (row locks absorb the
/// duplicate dispatch), while exactly one should be primary and run the
/// recovery pass.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub nats_url: String,
    pub bind_addr: SocketAddr,
    pub primary: bool,
    pub scheduler_enabled: bool,
    pub scheduler_interval: Duration,
    pub jupyter_setup_script: PathBuf,
    pub jupyter_image: String,
}

impl Config {
    /// Panics on missing or malformed variables; there is no serving
    /// half-configured.
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let max_connections = std::env::var("MAX_CONNECTIONS")
            .unwrap_or("10".to_string())
            .parse::<u32>()
            .expect("MAX_CONNECTIONS must be a number");
        let nats_url = std::env::var("NATS_URL").expect("NATS_URL must be set");
        let bind_addr = std::env::var("BIND_ADDR")
            .unwrap_or("0.0.0.0:8000".to_string())
            .parse()
            .expect("BIND_ADDR must be a socket address");
        let scheduler_interval = std::env::var("SCHEDULER_INTERVAL_SECONDS")
            .unwrap_or("10".to_string())
            .parse::<u64>()
            .map(Duration::from_secs)
            .expect("SCHEDULER_INTERVAL_SECONDS must be a number");
        let jupyter_setup_script = std::env::var("JUPYTER_SETUP_SCRIPT")
            .unwrap_or("/userdir/.jupyter-setup.sh".to_string())
            .into();
        let jupyter_image =
            std::env::var("JUPYTER_IMAGE").unwrap_or("jupyter-server:latest".to_string());

        Self {
            database_url,
            max_connections,
            nats_url,
            bind_addr,
            primary: env_flag("PRIMARY", false),
            scheduler_enabled: env_flag("SCHEDULER_ENABLED", true),
            scheduler_interval,
            jupyter_setup_script,
            jupyter_image,
        }
    }
}

pub fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE" | "True"),
        Err(_) => default,
    }
}
