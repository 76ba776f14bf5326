//! Configuration module for the Portfolio API
//!
//! Configuration is read once at startup from the process environment (and a
//! `.env` file when present), validated, and then shared read-only with every
//! handler through the application state.

use anyhow::{anyhow, bail, Context, Result};
use axum::http::HeaderValue;
use shared::observability::LogFormat;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Presigned download URLs are valid for one hour.
pub const PRESIGN_EXPIRY_SECS: u64 = 3600;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

/// Main configuration structure for the Portfolio API
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub cors: CorsSettings,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let config = Self {
            server: ServerConfig::from_vars(&vars)?,
            database: DatabaseConfig::from_vars(&vars)?,
            storage: StorageConfig::from_vars(&vars)?,
            cors: CorsSettings::from_vars(&vars),
            logging: LoggingConfig::from_vars(&vars)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.storage.validate()?;
        self.cors.validate()?;
        Ok(())
    }
}

/// Thin wrapper over the lookup function with typed accessors
struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| anyhow!("Missing required environment variable {}", key))
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match self.get(key) {
            Some(raw) => raw.parse().with_context(|| format!("Invalid {}", key)),
            None => Ok(default),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_upload_mb: usize,
}

impl ServerConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        Ok(Self {
            host: vars.get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: vars.parse_or("PORT", 8000)?,
            max_upload_mb: vars.parse_or("MAX_UPLOAD_MB", 50)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("PORT must be greater than 0");
        }
        if self.max_upload_mb == 0 {
            bail!("MAX_UPLOAD_MB must be greater than 0");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// TLS policy for the database connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SslMode {
    Disable,
    Prefer,
    Require,
    VerifyCa,
    VerifyFull,
}

impl FromStr for SslMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-ca" => Ok(SslMode::VerifyCa),
            "verify-full" => Ok(SslMode::VerifyFull),
            other => Err(anyhow!("Invalid DB_SSL_MODE: {}", other)),
        }
    }
}

/// Database configuration
#[derive(Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    pub ssl_mode: SslMode,
    pub ssl_root_cert: Option<PathBuf>,
}

impl DatabaseConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let requested = match vars.get("DB_SSL_MODE") {
            Some(raw) => raw.parse()?,
            None => SslMode::VerifyFull,
        };
        let accept_invalid_certs = vars.parse_or("DB_ACCEPT_INVALID_CERTS", false)?;
        let allow_plaintext = vars.parse_or("DB_ALLOW_PLAINTEXT", false)?;

        if requested == SslMode::Disable && !allow_plaintext {
            bail!("DB_SSL_MODE=disable requires DB_ALLOW_PLAINTEXT=true");
        }

        Ok(Self {
            host: vars.require("DB_HOST")?,
            port: vars.parse_or("DB_PORT", 5432)?,
            username: vars.require("DB_USER")?,
            password: vars.require("DB_PASSWORD")?,
            database: vars.require("DB_NAME")?,
            ssl_mode: effective_ssl_mode(requested, accept_invalid_certs),
            ssl_root_cert: vars.get("DB_SSL_ROOT_CERT").map(PathBuf::from),
        })
    }

    /// True when credentials and queries travel unencrypted
    pub fn is_plaintext(&self) -> bool {
        self.ssl_mode == SslMode::Disable
    }

    /// True when the connection is encrypted but the server certificate is not checked
    pub fn skips_certificate_validation(&self) -> bool {
        matches!(self.ssl_mode, SslMode::Require | SslMode::Prefer)
    }
}

/// The certificate opt-out only ever downgrades a verifying mode to `Require`.
fn effective_ssl_mode(requested: SslMode, accept_invalid_certs: bool) -> SslMode {
    match requested {
        SslMode::VerifyCa | SslMode::VerifyFull if accept_invalid_certs => SslMode::Require,
        mode => mode,
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("ssl_root_cert", &self.ssl_root_cert)
            .finish()
    }
}

/// Static access keys for the object store
#[derive(Clone)]
pub struct StorageCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StorageCredentials(<redacted>)")
    }
}

/// Object storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,
    /// When `None` the AWS default credential chain is used
    pub credentials: Option<StorageCredentials>,
    /// S3-compatible endpoint (MinIO etc.), forces path-style addressing
    pub endpoint: Option<String>,
    pub public_base_url: Option<String>,
    pub key_prefix: String,
    pub presign_expiry_secs: u64,
}

impl StorageConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let credentials = match (vars.get("AWS_ACCESS_KEY_ID"), vars.get("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(StorageCredentials {
                access_key_id,
                secret_access_key,
            }),
            (None, None) => None,
            _ => bail!("AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set together"),
        };

        Ok(Self {
            bucket: vars.require("S3_BUCKET_NAME")?,
            region: vars.get("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            credentials,
            endpoint: vars.get("S3_ENDPOINT").map(|e| e.trim_end_matches('/').to_string()),
            public_base_url: vars
                .get("S3_PUBLIC_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string()),
            key_prefix: vars
                .get("S3_KEY_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| "images".to_string()),
            presign_expiry_secs: PRESIGN_EXPIRY_SECS,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            bail!("S3_BUCKET_NAME must not be empty");
        }
        if self.key_prefix.is_empty() {
            bail!("S3_KEY_PREFIX must not be empty");
        }
        Ok(())
    }
}

/// Cross-origin policy settings
#[derive(Debug, Clone)]
pub struct CorsSettings {
    pub allowed_origins: Vec<String>,
    pub frontend_domain: Option<String>,
}

impl CorsSettings {
    fn from_vars(vars: &Vars<'_>) -> Self {
        let mut allowed_origins: Vec<String> = vars
            .get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let frontend_domain = vars.get("FRONTEND_DOMAIN");
        if let Some(domain) = &frontend_domain {
            if !allowed_origins.contains(domain) {
                allowed_origins.push(domain.clone());
            }
        }

        Self {
            allowed_origins,
            frontend_domain,
        }
    }

    pub fn validate(&self) -> Result<()> {
        // Credentials are allowed, so `*` is never honoured by the CORS layer.
        let usable = self
            .allowed_origins
            .iter()
            .any(|origin| origin != "*" && HeaderValue::from_str(origin).is_ok());
        if !usable {
            bail!("At least one explicit, valid CORS origin is required");
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl LoggingConfig {
    fn from_vars(vars: &Vars<'_>) -> Result<Self> {
        let format = vars
            .get("LOG_FORMAT")
            .unwrap_or_else(|| "pretty".to_string())
            .to_lowercase();

        format
            .parse::<LogFormat>()
            .with_context(|| format!("Invalid LOG_FORMAT: {}", format))?;

        Ok(Self {
            level: vars.get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            format,
        })
    }
}
