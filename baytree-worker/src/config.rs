/// Configuration management for the worker
///
/// Loads configuration from environment variables (and a `.env` file when
/// present).
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `VIEWS_BASE_URL`: Views REST root (default: https://app.viewsapp.net/api/restful)
/// - `VIEWS_USERNAME` / `VIEWS_PASSWORD`: Views service credentials (required)
/// - `VIEWS_TIMEOUT_SECS`: Per-request timeout (default: 30)
/// - `VIEWS_MAX_RETRIES`: Retries for contact searches (default: 3)
/// - `SYNC_CONCURRENCY`: Records imported at once (default: 4)
/// - `SYNC_TEMPORARY_PASSWORD`: Initial password for imported users (default: admin123)
/// - `JWT_SECRET`: Password-reset token secret, at least 32 characters (optional)
/// - `LOG_FORMAT`: `pretty` or `json` (default: pretty)
/// - `RUST_LOG`: Log filter (default: info)
///
/// # Example
///
/// ```no_run
/// use baytree_worker::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Syncing from {}", config.views.base_url);
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;

/// Default Views REST root
pub const DEFAULT_VIEWS_BASE_URL: &str = "https://app.viewsapp.net/api/restful";

/// Complete worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseSettings,
    pub views: ViewsConfig,
    pub sync: SyncConfig,

    /// Absent when password resets are not served by this process
    pub jwt: Option<JwtConfig>,

    pub log_format: LogFormat,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Views API configuration
#[derive(Debug, Clone)]
pub struct ViewsConfig {
    /// REST root, without trailing slash
    pub base_url: String,

    pub username: String,
    pub password: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt for contact searches
    pub max_retries: u32,
}

/// Directory sync configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Records processed concurrently
    pub concurrency: usize,

    /// Password given to every newly imported user
    pub temporary_password: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            temporary_password: "admin123".to_string(),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for reset-token signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,

    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{}'", other),
        }
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does
    /// not parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let max_connections = or_default("DATABASE_MAX_CONNECTIONS", "10")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("DATABASE_MAX_CONNECTIONS: {}", e))?;

        let timeout_secs = or_default("VIEWS_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("VIEWS_TIMEOUT_SECS: {}", e))?;
        if timeout_secs == 0 {
            anyhow::bail!("VIEWS_TIMEOUT_SECS must be greater than zero");
        }

        let max_retries = or_default("VIEWS_MAX_RETRIES", "3")
            .parse::<u32>()
            .map_err(|e| anyhow::anyhow!("VIEWS_MAX_RETRIES: {}", e))?;

        let concurrency = or_default("SYNC_CONCURRENCY", "4")
            .parse::<usize>()
            .map_err(|e| anyhow::anyhow!("SYNC_CONCURRENCY: {}", e))?;
        if concurrency == 0 {
            anyhow::bail!("SYNC_CONCURRENCY must be at least 1");
        }

        let jwt = match lookup("JWT_SECRET") {
            Some(secret) if secret.len() < 32 => {
                anyhow::bail!("JWT_SECRET must be at least 32 characters long")
            }
            Some(secret) => Some(JwtConfig { secret }),
            None => None,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database: DatabaseSettings {
                url: required("DATABASE_URL")?,
                max_connections,
            },
            views: ViewsConfig {
                base_url: or_default("VIEWS_BASE_URL", DEFAULT_VIEWS_BASE_URL)
                    .trim_end_matches('/')
                    .to_string(),
                username: required("VIEWS_USERNAME")?,
                password: required("VIEWS_PASSWORD")?,
                timeout_secs,
                max_retries,
            },
            sync: SyncConfig {
                concurrency,
                temporary_password: or_default(
                    "SYNC_TEMPORARY_PASSWORD",
                    &SyncConfig::default().temporary_password,
                ),
            },
            jwt,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    const MINIMAL: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgresql://localhost/baytree"),
        ("VIEWS_USERNAME", "service"),
        ("VIEWS_PASSWORD", "secret"),
    ];

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(MINIMAL)).unwrap();

        assert_eq!(config.views.base_url, DEFAULT_VIEWS_BASE_URL);
        assert_eq!(config.views.timeout_secs, 30);
        assert_eq!(config.views.max_retries, 3);
        assert_eq!(config.sync.concurrency, 4);
        assert_eq!(config.sync.temporary_password, "admin123");
        assert_eq!(config.database.max_connections, 10);
        assert!(config.jwt.is_none());
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_overrides() {
        let mut vars = MINIMAL.to_vec();
        vars.extend([
            ("VIEWS_BASE_URL", "http://views.test/api/"),
            ("SYNC_CONCURRENCY", "8"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("LOG_FORMAT", "JSON"),
        ]);

        let config = Config::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(config.views.base_url, "http://views.test/api");
        assert_eq!(config.sync.concurrency, 8);
        assert!(config.jwt.is_some());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_missing_credentials() {
        let err = Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgresql://x")])).unwrap_err();
        assert!(err.to_string().contains("VIEWS_USERNAME"));
    }

    #[test]
    fn test_rejects_short_jwt_secret() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("JWT_SECRET", "short"));
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("SYNC_CONCURRENCY", "0"));
        assert!(Config::from_lookup(lookup_from(&vars)).is_err());
    }
}
