//! Typed process configuration, loaded from the environment at startup.
//!
//! The rest of this workspace's object-store clients read their own connection
//! settings straight out of `std::env` rather than through a dedicated config
//! crate; `AppConfig` follows the same convention; one parse pass at startup into
//! a plain struct, `Default` for everything so tests never need real env vars.

use std::env;
use std::time::Duration;

/// Bytes in a mebibyte, used by the part-size rounding rule in [`UploadLimits`].
const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub limits: UploadLimits,
    pub download: DownloadLimits,
    pub s3: S3Config,
    pub redis: RedisConfig,
    pub public_base_url: String,
    pub listen_addr: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct UploadLimits {
    pub max_file_size: u64,
    pub max_expire_seconds: u64,
    pub default_expire_seconds: u64,
    pub multipart_threshold: u64,
    pub default_part_size: u64,
    pub max_parts: u32,
    pub max_part_size: u64,
    pub url_sign_batch_size: usize,
}

#[derive(Debug, Clone)]
pub struct DownloadLimits {
    pub max_downloads: u32,
    pub default_downloads: u32,
    pub signed_url_ttl: Duration,
    pub download_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub path_style: bool,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 5 * 1024 * MIB,
            max_expire_seconds: 7 * 24 * 3600,
            default_expire_seconds: 24 * 3600,
            multipart_threshold: 16 * MIB,
            default_part_size: 8 * MIB,
            max_parts: 10_000,
            max_part_size: 5 * 1024 * MIB,
            url_sign_batch_size: 100,
        }
    }
}

impl Default for DownloadLimits {
    fn default() -> Self {
        Self {
            max_downloads: 1000,
            default_downloads: 1,
            signed_url_ttl: Duration::from_secs(3600),
            download_grace: Duration::from_secs(5 * 60),
        }
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            bucket: "transfer".to_string(),
            region: None,
            endpoint: None,
            path_style: false,
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            limits: UploadLimits::default(),
            download: DownloadLimits::default(),
            s3: S3Config::default(),
            redis: RedisConfig::default(),
            public_base_url: "http://localhost:8080".to_string(),
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    /// Loads configuration from the environment, falling back to the documented
    /// defaults for anything unset. Never fails; a missing `S3_BUCKET` or
    /// `REDIS_URL` is discovered at first use, not at startup, matching how the
    /// S3 and Redis clients this crate wraps resolve their own settings lazily.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let limits = UploadLimits {
            max_file_size: env_u64("MAX_FILE_SIZE", defaults.limits.max_file_size),
            max_expire_seconds: env_u64("MAX_EXPIRE_SECONDS", defaults.limits.max_expire_seconds),
            default_expire_seconds: env_u64(
                "DEFAULT_EXPIRE_SECONDS",
                defaults.limits.default_expire_seconds,
            ),
            multipart_threshold: env_u64(
                "MULTIPART_THRESHOLD",
                defaults.limits.multipart_threshold,
            ),
            default_part_size: env_u64("DEFAULT_PART_SIZE", defaults.limits.default_part_size),
            max_parts: env_u32("MAX_PARTS", defaults.limits.max_parts),
            max_part_size: env_u64("MAX_PART_SIZE", defaults.limits.max_part_size),
            url_sign_batch_size: env_usize(
                "URL_SIGN_BATCH_SIZE",
                defaults.limits.url_sign_batch_size,
            ),
        };

        let download = DownloadLimits {
            max_downloads: env_u32("MAX_DOWNLOADS", defaults.download.max_downloads),
            default_downloads: env_u32("DEFAULT_DOWNLOADS", defaults.download.default_downloads),
            signed_url_ttl: Duration::from_secs(env_u64(
                "SIGNED_URL_TTL",
                defaults.download.signed_url_ttl.as_secs(),
            )),
            download_grace: Duration::from_millis(env_u64(
                "DOWNLOAD_GRACE_MS",
                defaults.download.download_grace.as_millis() as u64,
            )),
        };

        let s3 = S3Config {
            bucket: env_string("S3_BUCKET", &defaults.s3.bucket),
            region: env::var("S3_REGION").ok(),
            endpoint: env::var("S3_ENDPOINT").ok(),
            path_style: env_bool("S3_PATH_STYLE", defaults.s3.path_style),
        };

        let redis = RedisConfig {
            url: env_string("REDIS_URL", &defaults.redis.url),
        };

        Self {
            limits,
            download,
            s3,
            redis,
            public_base_url: env_string("PUBLIC_BASE_URL", &defaults.public_base_url),
            listen_addr: env_string("LISTEN_ADDR", &defaults.listen_addr),
            request_timeout: Duration::from_secs(env_u64(
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = AppConfig::default();
        assert!(cfg.limits.multipart_threshold < cfg.limits.max_file_size);
        assert!(cfg.limits.default_part_size <= cfg.limits.max_part_size);
        assert!(cfg.download.default_downloads <= cfg.download.max_downloads);
    }
}
