use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use teloxide::prelude::*;
use tracing::info;

use vip_link_bot::authority::TelegramAuthority;
use vip_link_bot::bot::{self, BotState};
use vip_link_bot::config::{load_dotenv, AppEnv, Config};
use vip_link_bot::link_issuer::LinkIssuer;
use vip_link_bot::logging::init_logging;

/// How often idle rate limiter entries are dropped
const RATE_LIMITER_PRUNE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Install logging before parsing configuration
    let dotenv_path = load_dotenv();
    init_logging(AppEnv::from_env())?;

    info!("🚀 Starting VIP Link Generator Bot...");
    if let Some(path) = dotenv_path {
        info!(path = %path.display(), "🔐 Environment variables loaded");
    }

    let config = Config::from_env()?;
    config.log_summary();

    let bot = Bot::new(config.bot_token.clone());
    let me = bot.get_me().await?;
    info!(bot_id = %me.user.id, username = ?me.user.username, "Bot initialized");

    let issuer = LinkIssuer::new(TelegramAuthority::new(bot.clone(), me.user.id));
    if !config.app_env.is_production() {
        issuer.check_permissions(&config.vip_group_ids).await;
    }

    let shared_state = Arc::new(BotState::new(config, issuer)?);

    {
        let state = Arc::clone(&shared_state);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(RATE_LIMITER_PRUNE_INTERVAL);
            loop {
                interval.tick().await;
                state.rate_limiter.prune();
            }
        });
    }

    info!(
        vip_groups = shared_state.config.vip_group_ids.len(),
        authorized_users = shared_state.config.authorized_user_ids.len(),
        "🎯 Bot is starting, private chats only"
    );

    let handler = dptree::entry().branch(Update::filter_message().endpoint({
        let state = Arc::clone(&shared_state);
        move |bot: Bot, msg: Message| {
            let state = Arc::clone(&state);
            async move { bot::message_handler(bot, msg, state).await }
        }
    }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
    Ok(())
}
