use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::auth::OtpPolicy;

const ENV_PREFIX: &str = "BUDGETWIZ";
const CONFIG_FILE: &str = "budgetwiz.toml";
const DB_FILE: &str = "budgetwiz.db";
/// One day. Longer-lived passcodes are refused at load time.
const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

/// Runtime settings. Later layers win: built-in defaults, the optional
/// `budgetwiz.toml` in the config dir, then `BUDGETWIZ_*` variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    pub database: Option<PathBuf>,
    /// Signed-in identity used when `--user` is not given.
    pub user: Option<String>,
    pub otp_url: String,
    pub mail_url: String,
    pub otp_ttl_minutes: i64,
    pub otp_max_attempts: u32,
    pub currency_symbol: String,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: None,
            user: None,
            otp_url: String::new(),
            mail_url: String::new(),
            otp_ttl_minutes: 10,
            otp_max_attempts: 5,
            currency_symbol: "₹".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "budgetwiz", "BudgetWiz")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))
}

impl Settings {
    pub(crate) fn load() -> Result<Self> {
        let file = project_dirs()?.config_dir().join(CONFIG_FILE);
        Self::load_from(Some(&file))
    }

    pub(crate) fn load_from(file: Option<&Path>) -> Result<Self> {
        Self::layered(file, config::Environment::with_prefix(ENV_PREFIX))
    }

    fn layered(file: Option<&Path>, env: config::Environment) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(env.try_parsing(true));
        let settings: Settings = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        if settings.otp_ttl_minutes > MAX_OTP_TTL_MINUTES {
            anyhow::bail!(
                "Invalid configuration: otp_ttl_minutes is {}, the limit is {MAX_OTP_TTL_MINUTES}",
                settings.otp_ttl_minutes
            );
        }
        tracing::debug!(?settings, "settings loaded");
        Ok(settings)
    }

    /// Configured database path, else `budgetwiz.db` in the platform data dir.
    pub(crate) fn db_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        let proj_dirs = project_dirs()?;
        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Ok(data_dir.join(DB_FILE))
    }

    pub(crate) fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            ttl: chrono::Duration::minutes(self.otp_ttl_minutes.clamp(1, MAX_OTP_TTL_MINUTES)),
            max_attempts: self.otp_max_attempts.max(1),
        }
    }
}
