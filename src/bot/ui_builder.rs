//! UI Builder module for formatting replies

use teloxide::utils::html;

use crate::link_issuer::{AggregateOutcome, LinkResult};
use crate::localization::LocalizationManager;
use crate::metrics::MetricsSnapshot;

/// What `/generate` answers with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateReply {
    /// Every group produced a link
    Links,
    /// At least one group failed because the bot lacks invite rights
    MissingPermissions,
    /// Some groups failed for other reasons
    Error,
}

/// Pick the reply for a finished link generation
pub fn generate_reply(outcome: &AggregateOutcome) -> GenerateReply {
    if outcome.all_succeeded() {
        GenerateReply::Links
    } else if outcome.permission_missing {
        GenerateReply::MissingPermissions
    } else {
        GenerateReply::Error
    }
}

/// Format the success message listing every link
pub fn format_links_message(
    messages: &LocalizationManager,
    links: &[LinkResult],
    group_ids: &[String],
) -> String {
    let link_label = messages.message("link-entry-link");
    let list: Vec<String> = links
        .iter()
        .map(|item| {
            format!(
                "🔗 <b>{}</b>\n   {}: {}\n",
                html::escape(&item.group_name),
                link_label,
                html::escape(&item.link)
            )
        })
        .collect();

    let groups = group_ids.join(", ");
    format!(
        "{}\n\n{}\n\n{}\n{}",
        messages.message("access-granted-title"),
        messages.message("access-granted-intro"),
        list.join("\n"),
        messages.message_with_args("access-granted-footer", &[("groups", groups.as_str())])
    )
}

pub fn format_help_message(
    messages: &LocalizationManager,
    group_count: usize,
    limit: u32,
    window_secs: u64,
) -> String {
    messages.message_with_args(
        "help",
        &[
            ("group_count", group_count.to_string().as_str()),
            ("limit", limit.to_string().as_str()),
            ("window", window_secs.to_string().as_str()),
        ],
    )
}

pub fn format_rate_limited_message(messages: &LocalizationManager, limit: u32, window_secs: u64) -> String {
    messages.message_with_args(
        "rate-limited",
        &[
            ("limit", limit.to_string().as_str()),
            ("window", window_secs.to_string().as_str()),
        ],
    )
}

/// Uptime as `Xh Ym`
pub fn format_uptime(uptime_secs: u64) -> String {
    format!("{}h {}m", uptime_secs / 3600, (uptime_secs % 3600) / 60)
}

/// Format the admin statistics message
pub fn format_stats_message(
    messages: &LocalizationManager,
    stats: &MetricsSnapshot,
    top_users: &[(u64, u64)],
    group_count: usize,
    user_count: usize,
) -> String {
    let top_users = if top_users.is_empty() {
        messages.message("stats-no-data")
    } else {
        top_users
            .iter()
            .enumerate()
            .map(|(i, (user_id, requests))| format!("{}. User {}: {} requests", i + 1, user_id, requests))
            .collect::<Vec<_>>()
            .join("\n")
    };

    messages.message_with_args(
        "stats",
        &[
            ("total_requests", stats.total_requests.to_string().as_str()),
            ("successful", stats.successful_generations.to_string().as_str()),
            ("failed", stats.failed_generations.to_string().as_str()),
            ("success_rate", format!("{:.1}", stats.success_rate()).as_str()),
            ("total_links", stats.total_links_generated.to_string().as_str()),
            ("avg_ms", (stats.average_response_time_ms.round() as u64).to_string().as_str()),
            ("uptime", format_uptime(stats.uptime_secs).as_str()),
            ("group_count", group_count.to_string().as_str()),
            ("user_count", user_count.to_string().as_str()),
            ("top_users", top_users.as_str()),
            ("last_reset", stats.last_reset.format("%Y-%m-%d %H:%M:%S UTC").to_string().as_str()),
        ],
    )
}
