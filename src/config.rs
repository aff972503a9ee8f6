use clap::{Parser, ValueEnum};
use std::{fmt, time::Duration};
use thiserror::Error;
use tracing::{debug, warn};

/// Centralized application configuration.
/// Built once from CLI arguments with environment fallbacks, then validated.
#[derive(Clone)]
pub struct AppConfig {
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub endpoint: Option<String>,
    pub region: String,
    pub expiry: Duration,
    pub host: String,
    pub proxy_port: u16,
    pub presign_port: u16,
    pub log_level: LogLevel,
    pub read_chunk_size: usize,
    pub request_timeout: Option<Duration>,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Serve S3 objects through presigned redirects and a range-aware proxy"
)]
pub struct Args {
    /// S3 source bucket
    #[arg(long, env = "BUCKET", default_value = "")]
    pub bucket: String,

    /// AWS access key id
    #[arg(long = "aws-access-key-id", env = "AWS_ACCESS_KEY_ID", default_value = "")]
    pub access_key: String,

    /// AWS secret access key
    #[arg(
        long = "aws-secret-access-key",
        env = "AWS_SECRET_ACCESS_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub secret_key: String,

    /// Custom S3 endpoint URL (MinIO, Ceph, ...)
    #[arg(long, env = "ENDPOINT")]
    pub endpoint: Option<String>,

    /// AWS region
    #[arg(long = "aws-region", env = "AWS_REGION", default_value = "us-west-2")]
    pub region: String,

    /// Lifetime of presigned URLs, e.g. `2h` or `90m`
    #[arg(long = "expiry-time", env = "EXPIRY_TIME", default_value = "2h", value_parser = parse_duration)]
    pub expiry: Duration,

    /// Address to bind listeners to
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Listening port for the streaming proxy (0 disables it)
    #[arg(long, env = "PROXY_PORT", default_value_t = 80)]
    pub proxy_port: u16,

    /// Listening port for the presign redirect service (0 disables it)
    #[arg(long, env = "PRESIGN_PORT", default_value_t = 8080)]
    pub presign_port: u16,

    /// Log level
    #[arg(long = "loglevel", env = "LOGLEVEL", value_enum, ignore_case = true, default_value = "INFO")]
    pub log_level: LogLevel,

    /// Largest byte window fetched from the store per read while streaming
    #[arg(long, env = "READ_CHUNK_SIZE", default_value_t = 32 * 1024)]
    pub read_chunk_size: usize,

    /// Per-call timeout for store operations, e.g. `30s`
    #[arg(long, env = "REQUEST_TIMEOUT", value_parser = parse_duration)]
    pub request_timeout: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no bucket specified")]
    MissingBucket,
    #[error("no AWS access key id specified")]
    MissingAccessKey,
    #[error("no AWS secret key specified")]
    MissingSecretKey,
    #[error("expiry time must be larger than zero")]
    NonPositiveExpiry,
    #[error("expiry time must not exceed 7 days")]
    ExpiryTooLong,
    #[error("read chunk size must be larger than zero")]
    ZeroChunkSize,
}

/// Longest validity a SigV4 presigned URL may carry.
pub const MAX_PRESIGN_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

fn parse_duration(raw: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(raw)
}

impl AppConfig {
    /// Parse CLI args (with environment fallbacks) into an AppConfig.
    pub fn from_env_and_args() -> Self {
        Self::from(Args::parse())
    }

    /// Check the configuration before anything touches the network.
    ///
    /// Pure apart from logging: calling it twice gives the same answer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.is_empty() {
            return Err(ConfigError::MissingBucket);
        }
        if self.access_key.is_empty() {
            return Err(ConfigError::MissingAccessKey);
        }
        if self.secret_key.is_empty() {
            return Err(ConfigError::MissingSecretKey);
        }
        if self.expiry.is_zero() {
            return Err(ConfigError::NonPositiveExpiry);
        }
        if self.expiry > MAX_PRESIGN_EXPIRY {
            return Err(ConfigError::ExpiryTooLong);
        }
        if self.read_chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }

        match self.endpoint.as_deref() {
            Some(endpoint) => debug!("endpoint {} will be used", endpoint),
            None => debug!("standard AWS endpoint will be used"),
        }
        if self.region.is_empty() {
            warn!("aws region is empty");
        }

        Ok(())
    }

    pub fn proxy_addr(&self) -> Option<String> {
        self.addr(self.proxy_port)
    }

    pub fn presign_addr(&self) -> Option<String> {
        self.addr(self.presign_port)
    }

    fn addr(&self, port: u16) -> Option<String> {
        (port != 0).then(|| format!("{}:{}", self.host, port))
    }
}

impl From<Args> for AppConfig {
    fn from(args: Args) -> Self {
        Self {
            bucket: args.bucket,
            access_key: args.access_key,
            secret_key: args.secret_key,
            endpoint: args.endpoint.filter(|e| !e.is_empty()),
            region: args.region,
            expiry: args.expiry,
            host: args.host,
            proxy_port: args.proxy_port,
            presign_port: args.presign_port,
            log_level: args.log_level,
            read_chunk_size: args.read_chunk_size,
            request_timeout: args.request_timeout,
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("bucket", &self.bucket)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("expiry", &self.expiry)
            .field("host", &self.host)
            .field("proxy_port", &self.proxy_port)
            .field("presign_port", &self.presign_port)
            .field("log_level", &self.log_level)
            .field("read_chunk_size", &self.read_chunk_size)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
