//! # Link Issuer Module
//!
//! Issues one single-use invite link per VIP group. Every group is handled by
//! its own branch: the title lookup and the link creation run concurrently,
//! link creation is retried under the [`RetryPolicy`], and a failing branch
//! never interrupts its siblings. Results come back in input order.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::authority::{InviteAuthority, InviteLinkSpec, MemberStatus};
use crate::link_errors::LinkError;
use crate::retry::{run_with_retry, RetryPolicy};

/// Link text shown in place of a token when a group failed
pub const FAILED_LINK_MARKER: &str = "❌ Failed to generate link";

/// Outcome for a single group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkResult {
    pub group_id: String,
    pub group_name: String,
    pub link: String,
}

impl LinkResult {
    fn success(group_id: &str, group_name: String, link: String) -> Self {
        Self {
            group_id: group_id.to_string(),
            group_name,
            link,
        }
    }

    fn failure(group_id: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            group_name: format!("Group {group_id} (Error)"),
            link: FAILED_LINK_MARKER.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.link == FAILED_LINK_MARKER
    }
}

/// Result of one `issue_links` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateOutcome {
    /// One entry per requested group, in request order
    pub links: Vec<LinkResult>,
    /// Set when any group failed because the bot lacks invite rights
    pub permission_missing: bool,
}

impl AggregateOutcome {
    pub fn failed_count(&self) -> usize {
        self.links.iter().filter(|link| link.is_failure()).count()
    }

    pub fn success_count(&self) -> usize {
        self.links.len() - self.failed_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed_count() == 0
    }
}

/// Startup diagnostic for a single group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionReport {
    pub group_id: String,
    pub group_name: Option<String>,
    pub status: Result<MemberStatus, LinkError>,
}

/// Issues invite links for a set of groups against an [`InviteAuthority`]
pub struct LinkIssuer<A> {
    authority: A,
    policy: RetryPolicy,
}

impl<A: InviteAuthority> LinkIssuer<A> {
    pub fn new(authority: A) -> Self {
        Self::with_policy(authority, RetryPolicy::default())
    }

    pub fn with_policy(authority: A, policy: RetryPolicy) -> Self {
        Self { authority, policy }
    }

    pub fn authority(&self) -> &A {
        &self.authority
    }

    /// Issue one link per group id.
    ///
    /// Never fails: every per-group failure is folded into a [`LinkResult`]
    /// carrying [`FAILED_LINK_MARKER`]. Duplicate ids are handled independently.
    pub async fn issue_links(&self, group_ids: &[String]) -> AggregateOutcome {
        let permission_missing = AtomicBool::new(false);

        let branches = group_ids
            .iter()
            .map(|group_id| self.issue_one(group_id, &permission_missing));
        let links = join_all(branches).await;

        AggregateOutcome {
            links,
            permission_missing: permission_missing.into_inner(),
        }
    }

    async fn issue_one(&self, group_id: &str, permission_missing: &AtomicBool) -> LinkResult {
        let (title, created) = tokio::join!(
            self.authority.chat_title(group_id),
            self.create_link_with_retry(group_id),
        );

        match created {
            Ok(link) => {
                let group_name = match title {
                    Ok(Some(title)) if !title.trim().is_empty() => title,
                    Ok(_) => format!("Group {group_id}"),
                    Err(err) => {
                        debug!(group_id, error = %err, "Could not resolve group title");
                        format!("Group {group_id}")
                    }
                };
                info!(group_id, group_name = %group_name, "Link generated for group");
                LinkResult::success(group_id, group_name, link)
            }
            Err(err) => {
                error!(group_id, kind = err.kind(), error = %err, "Failed to generate link for group");
                match &err {
                    LinkError::Permission(_) => {
                        permission_missing.store(true, Ordering::Relaxed);
                    }
                    LinkError::NotFound(_) => {
                        warn!(group_id, "Group no longer exists or bot was removed");
                    }
                    LinkError::Ejected(_) => {
                        error!(group_id, critical = true, "🚨 CRITICAL: Bot was removed from group");
                    }
                    LinkError::Throttled { .. } | LinkError::Transient(_) => {}
                }
                LinkResult::failure(group_id)
            }
        }
    }

    async fn create_link_with_retry(&self, group_id: &str) -> Result<String, LinkError> {
        run_with_retry(&self.policy, group_id, |_attempt| async move {
            // A fresh label per attempt so retries never collide with an earlier link
            let spec = InviteLinkSpec::fresh();
            self.authority.create_invite_link(group_id, &spec).await
        })
        .await
    }

    /// Check that the bot can invite users in every group and log the result.
    ///
    /// Groups are checked one after another; failures are reported, not raised.
    pub async fn check_permissions(&self, group_ids: &[String]) -> Vec<PermissionReport> {
        info!("Testing bot permissions in groups...");
        let mut reports = Vec::with_capacity(group_ids.len());

        for group_id in group_ids {
            let group_name = self.authority.chat_title(group_id).await.ok().flatten();
            let label = group_name.clone().unwrap_or_else(|| group_id.clone());
            let status = self.authority.bot_member_status(group_id).await;

            match &status {
                Ok(member) if member.can_invite() => {
                    info!(group_id = %group_id, group = %label, "✅ Bot can invite users");
                }
                Ok(member) => {
                    warn!(group_id = %group_id, group = %label, status = ?member, "⚠️ Bot cannot create invite links");
                }
                Err(err) => {
                    error!(group_id = %group_id, error = %err, "Cannot access group");
                }
            }

            reports.push(PermissionReport {
                group_id: group_id.clone(),
                group_name,
                status,
            });
        }

        reports
    }
}
