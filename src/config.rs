//! # Configuration Module
//!
//! Reads the bot configuration from the environment. Call [`load_dotenv`]
//! first to pick up a `.env` file from the working directory or its parent.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::{info, warn};

/// Supergroups and channels carry the `-100` prefix
static GROUP_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-100\d{10,}$").expect("valid group id pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} is required in environment variables")]
    Missing(&'static str),
    #[error("No valid user IDs found in AUTHORIZED_USER_IDS")]
    NoAuthorizedUsers,
    #[error("No valid group IDs found in VIP_GROUP_IDS. Format: -100XXXXXXXXXX")]
    NoVipGroups,
}

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppEnv {
    #[default]
    Development,
    Production,
}

impl AppEnv {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => AppEnv::Production,
            _ => AppEnv::Development,
        }
    }

    /// Read `APP_ENV` from the process environment
    pub fn from_env() -> Self {
        std::env::var("APP_ENV")
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn is_production(&self) -> bool {
        *self == AppEnv::Production
    }
}

/// Validated bot configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bot_token: String,
    /// The first entry is the administrator
    pub authorized_user_ids: Vec<u64>,
    pub vip_group_ids: Vec<String>,
    pub app_env: AppEnv,
}

impl Config {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let authorized = lookup("AUTHORIZED_USER_IDS")
            .filter(|ids| !ids.trim().is_empty())
            .ok_or(ConfigError::Missing("AUTHORIZED_USER_IDS"))?;
        let authorized_user_ids = parse_user_ids(&authorized);
        if authorized_user_ids.is_empty() {
            return Err(ConfigError::NoAuthorizedUsers);
        }

        let groups = lookup("VIP_GROUP_IDS").ok_or(ConfigError::Missing("VIP_GROUP_IDS"))?;
        let vip_group_ids = parse_group_ids(&groups);
        if vip_group_ids.is_empty() {
            return Err(ConfigError::NoVipGroups);
        }

        let app_env = lookup("APP_ENV")
            .map(|value| AppEnv::parse(&value))
            .unwrap_or_default();

        Ok(Self {
            bot_token: bot_token.trim().to_string(),
            authorized_user_ids,
            vip_group_ids,
            app_env,
        })
    }

    pub fn is_authorized(&self, user_id: u64) -> bool {
        self.authorized_user_ids.contains(&user_id)
    }

    pub fn is_admin(&self, user_id: u64) -> bool {
        self.authorized_user_ids.first() == Some(&user_id)
    }

    /// Log a summary without the token
    pub fn log_summary(&self) {
        info!(
            authorized_users = self.authorized_user_ids.len(),
            vip_groups = self.vip_group_ids.len(),
            app_env = ?self.app_env,
            "✅ Configuration validated successfully"
        );
    }
}

fn parse_user_ids(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|id| id.trim().parse::<u64>().ok())
        .collect()
}

fn parse_group_ids(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .filter(|id| {
            let valid = GROUP_ID_PATTERN.is_match(id);
            if !valid {
                warn!(group_id = %id, "⚠️ Invalid group ID format (expected -100XXXXXXXXXX)");
            }
            valid
        })
        .map(str::to_string)
        .collect()
}

fn dotenv_candidates(cwd: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![cwd.join(".env")];
    if let Some(parent) = cwd.parent() {
        candidates.push(parent.join(".env"));
    }
    candidates
}

/// Load the first `.env` found in the working directory or its parent.
///
/// Returns the loaded path. Runs before logging is installed, so the caller
/// logs it.
pub fn load_dotenv() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        for candidate in dotenv_candidates(&cwd) {
            if candidate.exists() && dotenv::from_path(&candidate).is_ok() {
                return Some(candidate);
            }
        }
    }
    dotenv::dotenv().ok()
}
