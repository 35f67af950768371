//! # Invite Authority Module
//!
//! The external authority that owns the VIP groups. In production this is the
//! Telegram Bot API reached through `teloxide::Bot`; tests provide scripted
//! implementations.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient, UserId};

use crate::link_errors::LinkError;

/// How long a generated invite link stays valid
pub const LINK_VALIDITY_SECS: i64 = 3600;
/// How many users may join through one link
pub const LINK_MEMBER_LIMIT: u32 = 1;
/// Prefix for generated link labels
pub const LINK_NAME_PREFIX: &str = "VIP";

const LABEL_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const LABEL_RANDOM_LEN: usize = 8;

/// Parameters for a single invite link creation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteLinkSpec {
    /// Unique label, `VIP-<random>-<unix millis>`
    pub name: String,
    pub expire_date: DateTime<Utc>,
    pub member_limit: u32,
}

impl InviteLinkSpec {
    /// Build a fresh spec valid for one hour and one user
    pub fn fresh() -> Self {
        Self::fresh_at(Utc::now())
    }

    pub fn fresh_at(now: DateTime<Utc>) -> Self {
        let mut rng = rand::thread_rng();
        let random: String = (0..LABEL_RANDOM_LEN)
            .map(|_| LABEL_ALPHABET[rng.gen_range(0..LABEL_ALPHABET.len())] as char)
            .collect();

        Self {
            name: format!("{LINK_NAME_PREFIX}-{random}-{}", now.timestamp_millis()),
            expire_date: now + ChronoDuration::seconds(LINK_VALIDITY_SECS),
            member_limit: LINK_MEMBER_LIMIT,
        }
    }
}

/// The bot's own standing in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Owner,
    Administrator { can_invite_users: bool },
    Other,
}

impl MemberStatus {
    pub fn can_invite(&self) -> bool {
        match self {
            MemberStatus::Owner => true,
            MemberStatus::Administrator { can_invite_users } => *can_invite_users,
            MemberStatus::Other => false,
        }
    }
}

/// Remote operations the link issuer needs from the group authority
#[async_trait]
pub trait InviteAuthority: Send + Sync {
    /// Human-readable title of the group, if it has one
    async fn chat_title(&self, group_id: &str) -> Result<Option<String>, LinkError>;

    /// Create a time- and use-limited invite link, returning the link itself
    async fn create_invite_link(
        &self,
        group_id: &str,
        spec: &InviteLinkSpec,
    ) -> Result<String, LinkError>;

    /// Membership status of the bot in the group
    async fn bot_member_status(&self, group_id: &str) -> Result<MemberStatus, LinkError>;
}

/// Numeric ids are chat ids, anything else is treated as a public username
fn recipient(group_id: &str) -> Recipient {
    match group_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(group_id.to_string()),
    }
}

/// Telegram Bot API authority.
///
/// Carries the bot's own user id, fetched once at startup, for membership checks.
#[derive(Clone)]
pub struct TelegramAuthority {
    bot: Bot,
    bot_user_id: UserId,
}

impl TelegramAuthority {
    pub fn new(bot: Bot, bot_user_id: UserId) -> Self {
        Self { bot, bot_user_id }
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn bot_user_id(&self) -> UserId {
        self.bot_user_id
    }
}

/// Map a Telegram membership onto what matters for invite links
pub fn member_status(kind: &ChatMemberKind) -> MemberStatus {
    if kind.is_owner() {
        return MemberStatus::Owner;
    }
    match kind {
        ChatMemberKind::Administrator(admin) => MemberStatus::Administrator {
            can_invite_users: admin.can_invite_users,
        },
        _ => MemberStatus::Other,
    }
}

#[async_trait]
impl InviteAuthority for TelegramAuthority {
    async fn chat_title(&self, group_id: &str) -> Result<Option<String>, LinkError> {
        let chat = self.bot.get_chat(recipient(group_id)).await?;
        Ok(chat.title().map(str::to_string))
    }

    async fn create_invite_link(
        &self,
        group_id: &str,
        spec: &InviteLinkSpec,
    ) -> Result<String, LinkError> {
        let link = self
            .bot
            .create_chat_invite_link(recipient(group_id))
            .name(spec.name.clone())
            .expire_date(spec.expire_date)
            .member_limit(spec.member_limit)
            .await?;
        Ok(link.invite_link)
    }

    async fn bot_member_status(&self, group_id: &str) -> Result<MemberStatus, LinkError> {
        let member = self
            .bot
            .get_chat_member(recipient(group_id), self.bot_user_id)
            .await?;
        Ok(member_status(&member.kind))
    }
}
