use anyhow::Result;

// ============================================================================
// Configuration Constants
// ============================================================================

// Default port values
const DEFAULT_API_PORT: u16 = 3001;
const DEFAULT_REALTIME_PORT: u16 = 3002;

// Default database pool settings
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// ============================================================================
// Protocol Constants
// ============================================================================

/// Maximum message content length, in characters after trimming.
pub const MAX_CONTENT_CHARS: usize = 500;

/// Default page size for conversation listing.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;

/// Hard cap on page size; larger requests are rejected, not clamped.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Maximum accepted realtime frame size. Join/leave frames are tiny; anything
/// larger indicates a misbehaving client.
pub const MAX_REALTIME_FRAME_SIZE: usize = 16 * 1024;

// ============================================================================
// Configuration Structures
// ============================================================================

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// When false, participant addresses are logged as salted hashes only.
    pub enable_address_logging: bool,
    pub hash_salt: String,
}

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Postgres connection string. When unset the server runs on the
    /// in-memory store (development mode; nothing survives a restart).
    pub database_url: Option<String>,
    /// Port for the REST gateway
    pub api_port: u16,
    /// Port for the realtime (WebSocket) hub
    pub realtime_port: u16,
    pub rust_log: String,
    pub db: DbConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            api_port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_API_PORT),
            realtime_port: std::env::var("REALTIME_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_REALTIME_PORT),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db: DbConfig {
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
                acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_DB_ACQUIRE_TIMEOUT_SECS),
            },
            logging: LoggingConfig {
                enable_address_logging: std::env::var("LOG_ADDRESSES")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(false),
                hash_salt: std::env::var("LOG_HASH_SALT")
                    .unwrap_or_else(|_| "wastechat-log-salt".to_string()),
            },
        })
    }

    /// Configuration for tests and embedded use: in-memory store, quiet logs.
    pub fn for_tests() -> Self {
        Self {
            database_url: None,
            api_port: 0,
            realtime_port: 0,
            rust_log: "warn".to_string(),
            db: DbConfig {
                max_connections: DEFAULT_DB_MAX_CONNECTIONS,
                acquire_timeout_secs: DEFAULT_DB_ACQUIRE_TIMEOUT_SECS,
            },
            logging: LoggingConfig {
                enable_address_logging: true,
                hash_salt: "test-salt".to_string(),
            },
        }
    }
}
