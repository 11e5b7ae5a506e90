use dotenvy::dotenv;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown STORE_BACKEND '{other}'")),
        }
    }
}

/// Credentials for one of the shared Inspector/Contractor accounts.
#[derive(Clone, Debug)]
pub struct FixedAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub store_backend: StoreBackend,
    pub store_path: PathBuf,
    pub database_url: Option<String>,
    pub store_timeout: Duration,
    pub request_timeout: Duration,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub bcrypt_cost: u32,
    pub geocoder_url: String,
    pub geocoder_timeout: Duration,
    pub max_photo_bytes: usize,
    pub inspector: FixedAccount,
    pub contractor: FixedAccount,
    pub log_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn fixed_account(prefix: &str, name: &str, email: &str, password: &str) -> FixedAccount {
    FixedAccount {
        name: var_or(&format!("{prefix}_NAME"), name),
        email: var_or(&format!("{prefix}_EMAIL"), email),
        password: var_or(&format!("{prefix}_PASSWORD"), password),
    }
}

impl Config {
    /// ✅ Load environment variables and set defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let store_backend: StoreBackend = parsed("STORE_BACKEND", StoreBackend::File)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        Ok(Self {
            bind_addr: parsed("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            store_backend,
            store_path: PathBuf::from(var_or("STORE_PATH", "data/db.json")),
            database_url,
            store_timeout: Duration::from_secs(parsed("STORE_TIMEOUT_SECS", 5)?),
            request_timeout: Duration::from_secs(parsed("REQUEST_TIMEOUT_SECS", 30)?),
            jwt_secret: env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?,
            token_ttl_secs: parsed("TOKEN_TTL_SECS", 36_000)?,
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            geocoder_url: var_or("GEOCODER_URL", "https://nominatim.openstreetmap.org"),
            geocoder_timeout: Duration::from_secs(parsed("GEOCODER_TIMEOUT_SECS", 5)?),
            max_photo_bytes: parsed("MAX_PHOTO_BYTES", 10 * 1024 * 1024)?,
            inspector: fixed_account("INSPECTOR", "Municipal Inspector", "inspector", "inspector"),
            contractor: fixed_account("CONTRACTOR", "Contractor Company", "contractor", "contractor"),
            log_dir: PathBuf::from(var_or("LOG_DIR", "logs")),
        })
    }

    /// Largest request body the API accepts: two photos in base64 plus slack.
    pub fn body_limit(&self) -> usize {
        (self.max_photo_bytes / 3)
            .saturating_mul(4 * 2)
            .saturating_add(64 * 1024)
    }
}
