use std::{env, sync::Arc, time::Duration};

#[derive(Clone, Debug)]
/// Configuration struct for the ledger service.
///
/// Holds everything needed to boot the process: database connection,
/// HTTP bind address and workers, logging sinks and the ledger's own
/// tunables (referral bonus length, per-operation deadline).
pub struct Config {
    // environment
    pub environment: String, // development or production
    /// The URL of the database to connect to.
    pub database_url: String,
    /// The hostname or IP address the server will bind to.
    pub server_host: String,
    /// The port number the server will listen on.
    pub server_port: u16,
    /// The number of worker threads to spawn for handling requests.
    pub num_workers: usize,
    /// A boolean indicating whether console logging is enabled.
    pub console_logging_enabled: bool,
    /// File receiving `INFO` ledger events.
    pub event_log_path: String,
    /// File receiving `ERROR` records.
    pub error_log_path: String,
    /// Settings consumed by the ledger engine.
    pub ledger: LedgerConfig,
}

#[derive(Clone, Debug)]
/// Tunables of the subscription & referral ledger.
pub struct LedgerConfig {
    /// Days granted to a referrer for every invited user.
    pub referral_bonus_days: u32,
    /// Deadline wrapped around every public ledger operation.
    pub operation_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            referral_bonus_days: 7,
            operation_timeout: Duration::from_secs(10),
        }
    }
}

impl LedgerConfig {
    /// Creates a new `LedgerConfig` from environment variables.
    ///
    /// - `REFERRAL_BONUS_DAYS`: Optional. Defaults to 7.
    /// - `OPERATION_TIMEOUT_SECS`: Optional. Defaults to 10.
    ///
    /// # Panics
    ///
    /// Panics if a variable is set but cannot be parsed, or if the bonus is zero days.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = LedgerConfig::default();
        let referral_bonus_days = env::var("REFERRAL_BONUS_DAYS")
            .map(|v| {
                v.parse()
                    .expect("REFERRAL_BONUS_DAYS must be a valid number")
            })
            .unwrap_or(defaults.referral_bonus_days);
        assert!(referral_bonus_days > 0, "REFERRAL_BONUS_DAYS must be positive");

        LedgerConfig {
            referral_bonus_days,
            operation_timeout: env::var("OPERATION_TIMEOUT_SECS")
                .map(|v| {
                    Duration::from_secs(
                        v.parse()
                            .expect("OPERATION_TIMEOUT_SECS must be a valid number"),
                    )
                })
                .unwrap_or(defaults.operation_timeout),
        }
    }
}

impl Config {
    /// Creates a new `Config` instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// Required:
    /// - `ENVIRONMENT`: `development` or `production`
    /// - `DATABASE_URL`: Connection string for the database
    ///
    /// Optional (with defaults):
    /// - `IP`: Server host (default: "127.0.0.1")
    /// - `PORT`: Server port (default: 8080)
    /// - `WORKERS`: Number of worker threads (default: 4)
    /// - `ENABLE_CONSOLE_LOGGING`: Whether to enable console logging (default: true)
    /// - `EVENT_LOG_PATH`: Events file (default: "logs/events.log")
    /// - `ERROR_LOG_PATH`: Errors file (default: "logs/errors.log")
    /// - Ledger settings (see [`LedgerConfig::from_env`])
    ///
    /// # Panics
    ///
    /// This function will panic if required environment variables are missing.
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            server_host: env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            num_workers: env::var("WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
            console_logging_enabled: env::var("ENABLE_CONSOLE_LOGGING")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                == "true",
            event_log_path: env::var("EVENT_LOG_PATH")
                .unwrap_or_else(|_| "logs/events.log".to_string()),
            error_log_path: env::var("ERROR_LOG_PATH")
                .unwrap_or_else(|_| "logs/errors.log".to_string()),
            ledger: LedgerConfig::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
