//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is loaded first when
//! present). Every optional value has a documented default below.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_CONCURRENT_DOWNLOADS: usize = 4;
const DOWNLOAD_TIMEOUT_SECS: u64 = 1800;
const MUX_TIMEOUT_SECS: u64 = 900;
const SHUTDOWN_GRACE_SECS: u64 = 30;
const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
const DEFAULT_AUDIO_CODEC: &str = "aac";
const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.youtube.com";

/// Database connection settings
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_seconds: u64,
}

/// Object storage settings
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub s3_endpoint: Option<String>,
    pub local_storage_path: Option<String>,
}

/// Ingestion pipeline settings
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub max_concurrent_downloads: usize,
    pub download_timeout_secs: u64,
    pub mux_timeout_secs: u64,
    pub ffmpeg_path: String,
    pub mux_audio_codec: String,
    pub temp_dir: Option<PathBuf>,
    pub youtube_default_quality: Option<String>,
    pub youtube_api_base: String,
    pub shutdown_grace_secs: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub log_format: String,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url =
            get("DATABASE_URL").ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let database = DatabaseConfig {
            url: database_url,
            max_connections: get("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|| MAX_CONNECTIONS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid number"))?,
            timeout_seconds: get("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_TIMEOUT_SECONDS must be a valid number"))?,
        };

        let backend = get("STORAGE_BACKEND")
            .unwrap_or_else(|| "s3".to_string())
            .parse::<StorageBackend>()?;

        let storage = StorageConfig {
            backend,
            s3_bucket: get("S3_BUCKET"),
            s3_region: get("S3_REGION").or_else(|| get("AWS_REGION")),
            s3_endpoint: get("S3_ENDPOINT"),
            local_storage_path: get("LOCAL_STORAGE_PATH"),
        };

        let pipeline = PipelineConfig {
            max_concurrent_downloads: get("MAX_CONCURRENT_DOWNLOADS")
                .unwrap_or_else(|| MAX_CONCURRENT_DOWNLOADS.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_DOWNLOADS),
            download_timeout_secs: get("DOWNLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|| DOWNLOAD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DOWNLOAD_TIMEOUT_SECS),
            mux_timeout_secs: get("MUX_TIMEOUT_SECS")
                .unwrap_or_else(|| MUX_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(MUX_TIMEOUT_SECS),
            ffmpeg_path: get("FFMPEG_PATH").unwrap_or_else(|| DEFAULT_FFMPEG_PATH.to_string()),
            mux_audio_codec: get("MUX_AUDIO_CODEC")
                .unwrap_or_else(|| DEFAULT_AUDIO_CODEC.to_string()),
            temp_dir: get("INGEST_TEMP_DIR").map(PathBuf::from),
            youtube_default_quality: get("YOUTUBE_DEFAULT_QUALITY"),
            youtube_api_base: get("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            shutdown_grace_secs: get("SHUTDOWN_GRACE_SECS")
                .unwrap_or_else(|| SHUTDOWN_GRACE_SECS.to_string())
                .parse()
                .unwrap_or(SHUTDOWN_GRACE_SECS),
        };

        Ok(Config {
            environment: get("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            log_format: get("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            database,
            storage,
            pipeline,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.database.url.starts_with("postgres://")
            || self.database.url.starts_with("postgresql://"))
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("S3_BUCKET is required when STORAGE_BACKEND=s3"));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH is required when STORAGE_BACKEND=local"
                    ));
                }
            }
        }

        if self.pipeline.max_concurrent_downloads == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_DOWNLOADS must be at least 1"));
        }

        if self.pipeline.download_timeout_secs == 0 || self.pipeline.mux_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Timeouts must be greater than zero"));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.download_timeout_secs)
    }

    pub fn mux_timeout(&self) -> Duration {
        Duration::from_secs(self.pipeline.mux_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.pipeline.shutdown_grace_secs)
    }
}
