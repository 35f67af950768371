//! Message Handler module for processing incoming Telegram messages

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tracing::{debug, error, info, warn};

use super::commands::{parse_command, Command};
use super::ui_builder::{
    format_help_message, format_links_message, format_rate_limited_message, format_stats_message,
    generate_reply, GenerateReply,
};
use super::BotState;

/// Number of users listed in `/stats`
const TOP_USERS_LIMIT: usize = 5;

async fn send_html(bot: &Bot, chat_id: ChatId, text: String) -> Result<Message> {
    let sent = bot.send_message(chat_id, text).parse_mode(ParseMode::Html).await?;
    Ok(sent)
}

/// Entry point for every message update
pub async fn message_handler(bot: Bot, msg: Message, state: Arc<BotState>) -> Result<()> {
    // Only private chats are served
    if !msg.chat.is_private() {
        debug!(chat_id = %msg.chat.id, "Ignoring message outside a private chat");
        return Ok(());
    }

    let Some(user) = msg.from.as_ref() else {
        warn!("Message received without user ID");
        return Ok(());
    };
    let user_id = user.id.0;
    let username = user.username.clone().unwrap_or_else(|| "unknown".to_string());

    if !state.rate_limiter.check(user_id) {
        warn!(user_id, username = %username, "Rate limit exceeded");
        let window_secs = state.rate_limiter.window().as_secs();
        let text = format_rate_limited_message(&state.messages, state.rate_limiter.limit(), window_secs);
        send_html(&bot, msg.chat.id, text).await?;
        return Ok(());
    }

    if !state.config.is_authorized(user_id) {
        warn!(event = "unauthorized_access", user_id, username = %username, "🚫 UNAUTHORIZED ACCESS ATTEMPT");
        send_html(&bot, msg.chat.id, state.messages.message("access-denied")).await?;
        return Ok(());
    }

    let Some(command) = msg.text().and_then(parse_command) else {
        return Ok(());
    };
    info!(user_id, username = %username, command = ?command, "Authorized user accessed the bot");

    match command {
        Command::Start => {
            send_html(&bot, msg.chat.id, state.messages.message("welcome")).await?;
        }
        Command::Generate => handle_generate(&bot, &msg, &state, user_id).await?,
        Command::Help => {
            let text = format_help_message(
                &state.messages,
                state.config.vip_group_ids.len(),
                state.rate_limiter.limit(),
                state.rate_limiter.window().as_secs(),
            );
            send_html(&bot, msg.chat.id, text).await?;
        }
        Command::Stats => handle_stats(&bot, &msg, &state, user_id).await?,
        Command::Unknown(name) => {
            debug!(user_id, command = %name, "Unknown command");
            send_html(&bot, msg.chat.id, state.messages.message("unknown-command")).await?;
        }
    }

    Ok(())
}

async fn handle_generate(bot: &Bot, msg: &Message, state: &BotState, user_id: u64) -> Result<()> {
    let started = Instant::now();
    info!(user_id, "User requested link generation");

    if let Err(e) = run_generate(bot, msg, state, user_id, started).await {
        state
            .metrics
            .record_link_generation(user_id, 0, started.elapsed(), true);
        error!(user_id, error = %e, "Error in link generation handler");
        send_html(bot, msg.chat.id, state.messages.message("error-generic")).await?;
    }
    Ok(())
}

async fn run_generate(
    bot: &Bot,
    msg: &Message,
    state: &BotState,
    user_id: u64,
    started: Instant,
) -> Result<()> {
    let processing = send_html(bot, msg.chat.id, state.messages.message("processing-links")).await?;

    let outcome = state.issuer.issue_links(&state.config.vip_group_ids).await;

    // Best effort, the links still go out if this fails
    if let Err(e) = bot.delete_message(msg.chat.id, processing.id).await {
        debug!(user_id, error = %e, "Failed to delete processing message");
    }

    let duration = started.elapsed();
    state.metrics.record_link_generation(
        user_id,
        outcome.success_count(),
        duration,
        !outcome.all_succeeded(),
    );

    match generate_reply(&outcome) {
        GenerateReply::Links => {
            let text = format_links_message(&state.messages, &outcome.links, &state.config.vip_group_ids);
            send_html(bot, msg.chat.id, text).await?;
            info!(
                user_id,
                link_count = outcome.links.len(),
                duration_ms = duration.as_millis() as u64,
                "✅ Successfully generated links"
            );
        }
        GenerateReply::MissingPermissions => {
            send_html(bot, msg.chat.id, state.messages.message("missing-permissions")).await?;
            error!(user_id, failed = outcome.failed_count(), "Permission error while generating links");
        }
        GenerateReply::Error => {
            send_html(bot, msg.chat.id, state.messages.message("error-generic")).await?;
            error!(user_id, failed = outcome.failed_count(), "Some links could not be generated");
        }
    }

    Ok(())
}

async fn handle_stats(bot: &Bot, msg: &Message, state: &BotState, user_id: u64) -> Result<()> {
    if !state.config.is_admin(user_id) {
        send_html(bot, msg.chat.id, state.messages.message("admin-only")).await?;
        return Ok(());
    }

    let stats = state.metrics.stats();
    let top_users = state.metrics.top_users(TOP_USERS_LIMIT);
    let text = format_stats_message(
        &state.messages,
        &stats,
        &top_users,
        state.config.vip_group_ids.len(),
        state.config.authorized_user_ids.len(),
    );
    send_html(bot, msg.chat.id, text).await?;

    info!(user_id, stats = %serde_json::to_string(&stats)?, "Admin viewed statistics");
    Ok(())
}
