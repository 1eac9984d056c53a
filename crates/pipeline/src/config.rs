//! Pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use prodshot_synthesis::api::DEFAULT_ENDPOINT;
use prodshot_synthesis::{SynthesisConfig, WarmupPolicy};

/// URL prefix generated images are served under.
pub const IMAGE_URL_PREFIX: &str = "/images";

/// URL prefix uploaded logos are served under.
pub const LOGO_URL_PREFIX: &str = "/uploads/logos";

#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {var}: '{value}'")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

/// Settings shared by the embedded worker and the standalone worker binary.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// `sqlite://` URL of the durable job store.
    pub database_url: String,
    /// Directory generated images are written to.
    pub image_dir: PathBuf,
    /// Directory uploaded logos are written to.
    pub logo_dir: PathBuf,
    pub synthesis: SynthesisConfig,
    /// Job starts allowed per `rate_limit_window`.
    pub rate_limit_max_jobs: usize,
    pub rate_limit_window: Duration,
    /// Fallback queue poll interval when no enqueue wake-up arrives.
    pub poll_interval: Duration,
    /// How long terminal jobs are kept before the retention sweep deletes them.
    pub job_retention: Duration,
    /// Extra fonts for text watermarks.
    pub font_dir: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://data/jobs.db".to_string(),
            image_dir: PathBuf::from("data/images"),
            logo_dir: PathBuf::from("data/logos"),
            synthesis: SynthesisConfig::default(),
            rate_limit_max_jobs: 10,
            rate_limit_window: Duration::from_secs(60),
            poll_interval: Duration::from_millis(1000),
            job_retention: Duration::from_secs(3600),
            font_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                      |
    /// |---------------------------|------------------------------|
    /// | `DATABASE_URL`            | `sqlite://data/jobs.db`      |
    /// | `IMAGE_DIR`               | `data/images`                |
    /// | `LOGO_DIR`                | `data/logos`                 |
    /// | `SYNTHESIS_URL`           | hosted SDXL endpoint         |
    /// | `SYNTHESIS_API_TOKEN`     | unset                        |
    /// | `SYNTHESIS_TIMEOUT_SECS`  | `120`                        |
    /// | `SYNTHESIS_MAX_ATTEMPTS`  | `3`                          |
    /// | `RATE_LIMIT_MAX_JOBS`     | `10`                         |
    /// | `RATE_LIMIT_WINDOW_SECS`  | `60`                         |
    /// | `WORKER_POLL_INTERVAL_MS` | `1000`                       |
    /// | `JOB_RETENTION_SECS`      | `3600`                       |
    /// | `FONT_DIR`                | unset                        |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/jobs.db".into());
        let image_dir = PathBuf::from(std::env::var("IMAGE_DIR").unwrap_or_else(|_| "data/images".into()));
        let logo_dir = PathBuf::from(std::env::var("LOGO_DIR").unwrap_or_else(|_| "data/logos".into()));

        let synthesis = SynthesisConfig {
            endpoint: std::env::var("SYNTHESIS_URL").unwrap_or_else(|_| DEFAULT_ENDPOINT.into()),
            api_token: std::env::var("SYNTHESIS_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout: Duration::from_secs(env_parse("SYNTHESIS_TIMEOUT_SECS", 120u64)?),
            warmup: WarmupPolicy {
                max_attempts: env_parse("SYNTHESIS_MAX_ATTEMPTS", 3u32)?.max(1),
                ..WarmupPolicy::default()
            },
        };

        Ok(Self {
            database_url,
            image_dir,
            logo_dir,
            synthesis,
            rate_limit_max_jobs: env_parse("RATE_LIMIT_MAX_JOBS", 10usize)?.max(1),
            rate_limit_window: Duration::from_secs(env_parse("RATE_LIMIT_WINDOW_SECS", 60u64)?),
            poll_interval: Duration::from_millis(env_parse("WORKER_POLL_INTERVAL_MS", 1000u64)?.max(10)),
            job_retention: Duration::from_secs(env_parse("JOB_RETENTION_SECS", 3600u64)?),
            font_dir: std::env::var("FONT_DIR").ok().map(PathBuf::from),
        })
    }
}

/// Parse `var` if set, otherwise return `default`.
pub fn env_parse<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { var, value }),
        Err(_) => Ok(default),
    }
}
