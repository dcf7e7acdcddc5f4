use std::time::Duration;

use storyboard_core::generation::{GenerationPolicy, DEFAULT_GENERATION_DELAY};

/// Default quiet period before edited scenes are written back.
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Which [`storyboard_db::store::Store`] implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Some(Self::Postgres),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
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
    /// Upper bound on post-shutdown cleanup in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Storage backend (default: `postgres`).
    pub store_backend: StoreBackend,
    /// Debounce applied to scene-list autosave (default: 1000 ms).
    pub autosave_debounce: Duration,
    /// Simulated duration of one image generation (default: 2000 ms).
    pub generation_delay: Duration,
    /// Scheduling of "generate all" (default: sequential).
    pub generation_policy: GenerationPolicy,
    /// Reset scenes stuck in `generating` when nothing is running for them.
    pub reconcile_stuck_generating: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            store_backend: StoreBackend::Postgres,
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
            generation_delay: DEFAULT_GENERATION_DELAY,
            generation_policy: GenerationPolicy::Sequential,
            reconcile_stuck_generating: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                    |
    /// |------------------------------|----------------------------|
    /// | `HOST`                       | `0.0.0.0`                  |
    /// | `PORT`                       | `3000`                     |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                       |
    /// | `STORE_BACKEND`              | `postgres`                 |
    /// | `AUTOSAVE_DEBOUNCE_MS`       | `1000`                     |
    /// | `GENERATION_DELAY_MS`        | `2000`                     |
    /// | `GENERATION_POLICY`          | `sequential`               |
    /// | `RECONCILE_STUCK_GENERATING` | `false`                    |
    ///
    /// `DATABASE_URL` is read separately by the binary when the postgres
    /// backend is selected.
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

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let store_backend = StoreBackend::parse(
            &std::env::var("STORE_BACKEND").unwrap_or_else(|_| "postgres".into()),
        )
        .expect("STORE_BACKEND must be 'postgres' or 'memory'");

        let autosave_debounce_ms: u64 = std::env::var("AUTOSAVE_DEBOUNCE_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("AUTOSAVE_DEBOUNCE_MS must be a valid u64");

        let generation_delay_ms: u64 = std::env::var("GENERATION_DELAY_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("GENERATION_DELAY_MS must be a valid u64");

        let generation_policy = GenerationPolicy::parse(
            &std::env::var("GENERATION_POLICY").unwrap_or_else(|_| "sequential".into()),
        )
        .unwrap_or_else(|e| panic!("GENERATION_POLICY is invalid: {e}"));

        let reconcile_stuck_generating: bool = std::env::var("RECONCILE_STUCK_GENERATING")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("RECONCILE_STUCK_GENERATING must be 'true' or 'false'");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            store_backend,
            autosave_debounce: Duration::from_millis(autosave_debounce_ms),
            generation_delay: Duration::from_millis(generation_delay_ms),
            generation_policy,
            reconcile_stuck_generating,
        }
    }
}
