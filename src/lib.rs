//! # VIP Link Telegram Bot
//!
//! A Telegram bot that hands authorized users temporary, single-use invite
//! links to a fixed set of VIP groups. Links for all groups are requested
//! concurrently, retried on transient failures, and reported per group.

pub mod authority;
pub mod bot;
pub mod config;
pub mod link_errors;
pub mod link_issuer;
pub mod localization;
pub mod logging;
pub mod metrics;
pub mod rate_limiter;
pub mod retry;
