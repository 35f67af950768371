//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `commands`: Parses command text into [`Command`]
//! - `message_handler`: Rate limiting, authorization and command handlers
//! - `ui_builder`: Formats replies from link outcomes and metrics

pub mod commands;
pub mod message_handler;
pub mod ui_builder;

use anyhow::Result;

use crate::authority::TelegramAuthority;
use crate::config::Config;
use crate::link_issuer::LinkIssuer;
use crate::localization::LocalizationManager;
use crate::metrics::MetricsService;
use crate::rate_limiter::UserRateLimiter;

pub use commands::{parse_command, Command};
pub use message_handler::message_handler;

/// Everything the handlers share across updates
pub struct BotState {
    pub config: Config,
    pub issuer: LinkIssuer<TelegramAuthority>,
    pub metrics: MetricsService,
    pub rate_limiter: UserRateLimiter,
    pub messages: LocalizationManager,
}

impl BotState {
    pub fn new(config: Config, issuer: LinkIssuer<TelegramAuthority>) -> Result<Self> {
        Ok(Self {
            config,
            issuer,
            metrics: MetricsService::new(),
            rate_limiter: UserRateLimiter::default(),
            messages: LocalizationManager::new()?,
        })
    }
}
