use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::Duration;
use lapse_jobs::ReaperConfig;

/// Upper bound for `LAPSE_POST_RETENTION_HOURS` (roughly a century).
pub const MAX_POST_RETENTION_HOURS: u64 = 100 * 365 * 24;

/// Service configuration, read from `LAPSE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    /// Bucket name embedded in generated media URLs.
    pub bucket: String,
    /// Origin clients use to reach this server, e.g. `https://media.example.com`.
    pub public_url: String,
    pub post_retention_hours: u64,
    pub reap_interval_secs: u64,
    pub blob_delete_concurrency: usize,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let port: u16 = parsed(&lookup, "LAPSE_PORT", 3300)?;
        let config = Self {
            host: string("LAPSE_HOST", "0.0.0.0"),
            port,
            db_path: string("LAPSE_DB_PATH", "lapse.db").into(),
            storage_dir: string("LAPSE_STORAGE_DIR", "./blob-storage").into(),
            bucket: string("LAPSE_BUCKET", "lapse-media"),
            public_url: lookup("LAPSE_PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{}", port)),
            post_retention_hours: parsed(&lookup, "LAPSE_POST_RETENTION_HOURS", 24)?,
            reap_interval_secs: parsed(&lookup, "LAPSE_REAP_INTERVAL_SECS", 24 * 60 * 60)?,
            blob_delete_concurrency: parsed(&lookup, "LAPSE_BLOB_DELETE_CONCURRENCY", 8)?,
            max_upload_bytes: parsed(&lookup, "LAPSE_MAX_UPLOAD_BYTES", 50 * 1024 * 1024)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.post_retention_hours == 0 {
            bail!("LAPSE_POST_RETENTION_HOURS must be at least 1");
        }
        if self.post_retention_hours > MAX_POST_RETENTION_HOURS {
            bail!(
                "LAPSE_POST_RETENTION_HOURS must be at most {}",
                MAX_POST_RETENTION_HOURS
            );
        }
        if self.reap_interval_secs == 0 {
            bail!("LAPSE_REAP_INTERVAL_SECS must be at least 1");
        }
        if self.blob_delete_concurrency == 0 {
            bail!("LAPSE_BLOB_DELETE_CONCURRENCY must be at least 1");
        }
        if self.bucket.is_empty() || self.bucket.contains('/') {
            bail!("LAPSE_BUCKET must be a non-empty name without '/'");
        }

        // Media URLs are `{public_url}/v0/b/{bucket}/o/{path}`; the reaper
        // relies on the origin contributing exactly three segments.
        let rest = self
            .public_url
            .strip_prefix("http://")
            .or_else(|| self.public_url.strip_prefix("https://"))
            .with_context(|| format!("LAPSE_PUBLIC_URL must be http(s): {}", self.public_url))?;
        let host = rest.trim_end_matches('/');
        if host.is_empty() || host.contains('/') {
            bail!(
                "LAPSE_PUBLIC_URL must be an origin without a path: {}",
                self.public_url
            );
        }

        Ok(())
    }

    pub fn reaper(&self) -> ReaperConfig {
        ReaperConfig {
            retention: i64::try_from(self.post_retention_hours)
                .ok()
                .and_then(Duration::try_hours)
                .unwrap_or(Duration::MAX),
            blob_delete_concurrency: self.blob_delete_concurrency,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 3300);
        assert_eq!(config.bucket, "lapse-media");
        assert_eq!(config.public_url, "http://localhost:3300");
        assert_eq!(config.post_retention_hours, 24);
        assert_eq!(config.reap_interval_secs, 86_400);

        let reaper = config.reaper();
        assert_eq!(reaper.retention, Duration::hours(24));
        assert_eq!(reaper.blob_delete_concurrency, 8);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("LAPSE_PORT", "8080"),
            ("LAPSE_PUBLIC_URL", "https://media.example.com/"),
            ("LAPSE_POST_RETENTION_HOURS", "48"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_url, "https://media.example.com/");
        assert_eq!(config.reaper().retention, Duration::hours(48));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("LAPSE_PORT", "eighty")]).is_err());
        assert!(config(&[("LAPSE_REAP_INTERVAL_SECS", "0")]).is_err());
        assert!(config(&[("LAPSE_POST_RETENTION_HOURS", "-1")]).is_err());
        assert!(config(&[("LAPSE_PUBLIC_URL", "https://example.com/api")]).is_err());
        assert!(config(&[("LAPSE_PUBLIC_URL", "ftp://example.com")]).is_err());
        assert!(config(&[("LAPSE_BUCKET", "a/b")]).is_err());
    }

    #[test]
    fn rejects_out_of_range_retention() {
        assert!(config(&[("LAPSE_POST_RETENTION_HOURS", "18446744073709551615")]).is_err());
        assert!(config(&[("LAPSE_POST_RETENTION_HOURS", "10000000000000")]).is_err());
        assert!(config(&[("LAPSE_POST_RETENTION_HOURS", "876001")]).is_err());

        let longest = config(&[("LAPSE_POST_RETENTION_HOURS", "876000")]).unwrap();
        assert_eq!(longest.reaper().retention, Duration::hours(876_000));
    }
}
