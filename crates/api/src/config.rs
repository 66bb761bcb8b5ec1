use std::path::PathBuf;
use std::time::Duration;

use studio_pipeline::RetryPolicy;
use studio_remote::RandomStrategy;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Directory holding the persisted history (default: `./data`).
    pub data_dir: PathBuf,
    /// Probability that a simulated call fails (default: `0.2`).
    pub failure_rate: f64,
    /// Simulated latency range in milliseconds (default: `1000..2000`).
    pub min_latency_ms: u64,
    pub max_latency_ms: u64,
    /// Attempts per generation (default: `3`).
    pub max_attempts: u32,
    /// How often the data directory is checked for writes made by other
    /// processes, in milliseconds (default: `1000`).
    pub sync_interval_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                 |
    /// |--------------------------|-------------------------|
    /// | `HOST`                   | `0.0.0.0`               |
    /// | `PORT`                   | `3000`                  |
    /// | `CORS_ORIGINS`           | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                    |
    /// | `STUDIO_DATA_DIR`        | `./data`                |
    /// | `STUDIO_FAILURE_RATE`    | `0.2`                   |
    /// | `STUDIO_MIN_LATENCY_MS`  | `1000`                  |
    /// | `STUDIO_MAX_LATENCY_MS`  | `2000`                  |
    /// | `STUDIO_MAX_ATTEMPTS`    | `3`                     |
    /// | `STUDIO_SYNC_INTERVAL_MS`| `1000`                  |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let data_dir = PathBuf::from(
            std::env::var("STUDIO_DATA_DIR").unwrap_or_else(|_| "./data".into()),
        );

        let failure_rate: f64 = std::env::var("STUDIO_FAILURE_RATE")
            .unwrap_or_else(|_| "0.2".into())
            .parse()
            .expect("STUDIO_FAILURE_RATE must be a number");
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "STUDIO_FAILURE_RATE must be between 0 and 1"
        );

        let min_latency_ms: u64 = std::env::var("STUDIO_MIN_LATENCY_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("STUDIO_MIN_LATENCY_MS must be a valid u64");

        let max_latency_ms: u64 = std::env::var("STUDIO_MAX_LATENCY_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("STUDIO_MAX_LATENCY_MS must be a valid u64");

        let max_attempts: u32 = std::env::var("STUDIO_MAX_ATTEMPTS")
            .unwrap_or_else(|_| "3".into())
            .parse()
            .expect("STUDIO_MAX_ATTEMPTS must be a valid u32");

        let sync_interval_ms: u64 = std::env::var("STUDIO_SYNC_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("STUDIO_SYNC_INTERVAL_MS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            data_dir,
            failure_rate,
            min_latency_ms,
            max_latency_ms,
            max_attempts,
            sync_interval_ms,
        }
    }

    /// The simulated backend's behaviour.
    pub fn simulation_strategy(&self) -> RandomStrategy {
        RandomStrategy {
            min_latency: Duration::from_millis(self.min_latency_ms),
            max_latency: Duration::from_millis(self.max_latency_ms),
            failure_rate: self.failure_rate,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_attempts)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }
}
