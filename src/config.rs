// config.rs - Database connection parameters
//
// Nothing is hard-coded: parameters come from the environment (optionally
// seeded from a `.env` file). `DATABASE_URL` wins when present, otherwise
// the usual libpq variables are used.

use crate::errors::{Error, Result};
use sqlx::postgres::PgConnectOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "postgres";
const DEFAULT_USER: &str = "postgres";
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Where and how to connect for a test run
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// Full connection URL; overrides the individual fields when set
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: Option<String>,
    /// How long to wait for the connection before giving up
    pub acquire_timeout: Duration,
    /// Create the postgis extension before running a test
    pub require_postgis: bool,
    /// Overrides fixture directory discovery
    pub fixture_dir: Option<PathBuf>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database: DEFAULT_DATABASE.to_string(),
            username: DEFAULT_USER.to_string(),
            password: None,
            acquire_timeout: Duration::from_secs(DEFAULT_ACQUIRE_TIMEOUT_SECS),
            require_postgis: true,
            fixture_dir: None,
        }
    }
}

impl DbConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PGPORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PGPORT is not a valid port: {raw}")))?,
            None => defaults.port,
        };

        let acquire_timeout = match non_empty("SPATIAL_DB_ACQUIRE_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!(
                    "SPATIAL_DB_ACQUIRE_TIMEOUT_SECS is not a number of seconds: {raw}"
                ))
            })?),
            None => defaults.acquire_timeout,
        };

        let require_postgis = match non_empty("SPATIAL_DB_REQUIRE_POSTGIS") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                Error::Config(format!("SPATIAL_DB_REQUIRE_POSTGIS is not a boolean: {raw}"))
            })?,
            None => defaults.require_postgis,
        };

        Ok(Self {
            url: non_empty("DATABASE_URL"),
            host: non_empty("PGHOST").unwrap_or(defaults.host),
            port,
            database: non_empty("PGDATABASE").unwrap_or(defaults.database),
            username: non_empty("PGUSER").unwrap_or(defaults.username),
            password: lookup("PGPASSWORD"),
            acquire_timeout,
            require_postgis,
            fixture_dir: non_empty("SPATIAL_DB_FIXTURE_DIR").map(PathBuf::from),
        })
    }

    /// Driver options for this configuration
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        let options = match &self.url {
            Some(url) => PgConnectOptions::from_str(url)
                .map_err(|e| Error::Config(format!("invalid DATABASE_URL: {e}")))?,
            None => {
                let options = PgConnectOptions::new()
                    .host(&self.host)
                    .port(self.port)
                    .database(&self.database)
                    .username(&self.username);
                match &self.password {
                    Some(password) => options.password(password),
                    None => options,
                }
            }
        };

        Ok(options.application_name("spatial_db_tests"))
    }

    /// The connection target with the password masked, for log lines
    pub fn redacted_url(&self) -> String {
        match &self.url {
            Some(url) => redact_password(url),
            None => format!(
                "postgres://{}@{}:{}/{}",
                self.username, self.host, self.port, self.database
            ),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Replace `:password@` in a URL's userinfo with `:***@`
fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let rest = &url[scheme_end..];
    let authority_end = rest.find('/').unwrap_or(rest.len());
    let Some(at) = rest[..authority_end].rfind('@') else {
        return url.to_string();
    };
    match rest[..at].find(':') {
        Some(colon) => format!(
            "{}{}:***{}",
            &url[..scheme_end],
            &rest[..colon],
            &rest[at..]
        ),
        None => url.to_string(),
    }
}
