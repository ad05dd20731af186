use std::net::SocketAddr;
use std::time::Duration;

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("invalid value for {key} ({raw:?}): {e}")),
        None => default,
    }
}

fn env_duration_secs(key: &str, default: Duration) -> Duration {
    match env_string(key) {
        Some(raw) => {
            let secs: f64 = raw
                .parse()
                .unwrap_or_else(|e| panic!("invalid value for {key} ({raw:?}): {e}"));
            Duration::from_secs_f64(secs)
        }
        None => default,
    }
}

/// Exponential backoff bounds for a replication worker's retry loop.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    pub fn from_env() -> Self {
        Self {
            initial_delay: env_duration_secs(
                "RETRY_DELAY_INITIAL",
                Self::default().initial_delay,
            ),
            max_delay: env_duration_secs("RETRY_DELAY_MAX", Self::default().max_delay),
        }
    }
}

/// Heartbeat probe cadence and unhealthy threshold for a health monitor.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub unhealthy_threshold: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(2),
            unhealthy_threshold: 3,
        }
    }
}

impl HeartbeatConfig {
    pub fn from_env() -> Self {
        Self {
            interval: env_duration_secs(
                "HEARTBEAT_INTERVAL_SECONDS",
                Self::default().interval,
            ),
            timeout: env_duration_secs("HEARTBEAT_TIMEOUT_SECONDS", Self::default().timeout),
            unhealthy_threshold: env_parse(
                "HEARTBEAT_UNHEALTHY_THRESHOLD",
                Self::default().unhealthy_threshold,
            ),
        }
    }
}

/// Master node configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub secondaries: Vec<String>,
    pub bind_addr: SocketAddr,
    pub retry: RetryConfig,
    pub heartbeat: HeartbeatConfig,
    pub write_concern_timeout: Duration,
    pub secondary_request_timeout: Duration,
}

impl MasterConfig {
    pub fn from_env() -> Self {
        let secondaries = env_string("SECONDARIES")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            secondaries,
            bind_addr: env_parse("BIND_ADDR", "0.0.0.0:7000".parse().unwrap()),
            retry: RetryConfig::from_env(),
            heartbeat: HeartbeatConfig::from_env(),
            write_concern_timeout: env_duration_secs(
                "WRITE_CONCERN_TIMEOUT_SECONDS",
                Duration::from_secs(10),
            ),
            secondary_request_timeout: env_duration_secs(
                "SECONDARY_REQUEST_TIMEOUT",
                Duration::from_secs(5),
            ),
        }
    }
}

/// Secondary node configuration, read once at process start.
#[derive(Debug, Clone)]
pub struct SecondaryConfig {
    pub master_url: Option<String>,
    pub server_id: String,
    pub bind_addr: SocketAddr,
    /// Artificial delay applied before committing — test hook.
    pub replication_delay: Duration,
    /// Probability (0.0-1.0) of returning a simulated 5xx after commit — test hook.
    pub error_rate: f64,
}

impl SecondaryConfig {
    pub fn from_env() -> Self {
        Self {
            master_url: env_string("MASTER_URL"),
            server_id: env_string("SERVER_ID").unwrap_or_else(random_server_id),
            bind_addr: env_parse("BIND_ADDR", "0.0.0.0:7001".parse().unwrap()),
            replication_delay: env_duration_secs("REPLICATION_DELAY", Duration::ZERO),
            error_rate: env_parse("ERROR_RATE", 0.0),
        }
    }
}

fn random_server_id() -> String {
    use rand::Rng;
    let suffix: u32 = rand::thread_rng().gen();
    format!("secondary-{suffix:08x}")
}
