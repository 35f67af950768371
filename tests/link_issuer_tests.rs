//! # Link Issuer Tests
//!
//! Exercises the fan-out, retry and classification behaviour of the link
//! issuer against a scripted authority. Tokio time is paused so backoff
//! delays complete instantly while still being measured.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use vip_link_bot::authority::{InviteAuthority, InviteLinkSpec, MemberStatus};
use vip_link_bot::link_errors::LinkError;
use vip_link_bot::link_issuer::{LinkIssuer, FAILED_LINK_MARKER};

/// Authority whose answers are scripted per group.
///
/// Link creation pops the next scripted result for the group; once the script
/// is exhausted it succeeds with `https://t.me/+<group>`.
#[derive(Default)]
struct ScriptedAuthority {
    titles: HashMap<String, Result<Option<String>, LinkError>>,
    scripts: Mutex<HashMap<String, VecDeque<Result<String, LinkError>>>>,
    latency: HashMap<String, Duration>,
    statuses: HashMap<String, Result<MemberStatus, LinkError>>,
    specs: Mutex<Vec<(String, InviteLinkSpec)>>,
}

impl ScriptedAuthority {
    fn title(mut self, group: &str, title: &str) -> Self {
        self.titles.insert(group.to_string(), Ok(Some(title.to_string())));
        self
    }

    fn title_error(mut self, group: &str, error: LinkError) -> Self {
        self.titles.insert(group.to_string(), Err(error));
        self
    }

    fn script(self, group: &str, results: Vec<Result<String, LinkError>>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(group.to_string(), results.into_iter().collect());
        self
    }

    fn latency(mut self, group: &str, latency: Duration) -> Self {
        self.latency.insert(group.to_string(), latency);
        self
    }

    fn status(mut self, group: &str, status: Result<MemberStatus, LinkError>) -> Self {
        self.statuses.insert(group.to_string(), status);
        self
    }

    fn attempts(&self, group: &str) -> usize {
        self.specs
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| g == group)
            .count()
    }

    fn labels(&self, group: &str) -> Vec<String> {
        self.specs
            .lock()
            .unwrap()
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, spec)| spec.name.clone())
            .collect()
    }
}

#[async_trait]
impl InviteAuthority for ScriptedAuthority {
    async fn chat_title(&self, group_id: &str) -> Result<Option<String>, LinkError> {
        self.titles.get(group_id).cloned().unwrap_or(Ok(None))
    }

    async fn create_invite_link(
        &self,
        group_id: &str,
        spec: &InviteLinkSpec,
    ) -> Result<String, LinkError> {
        if let Some(latency) = self.latency.get(group_id) {
            tokio::time::sleep(*latency).await;
        }
        self.specs
            .lock()
            .unwrap()
            .push((group_id.to_string(), spec.clone()));

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(group_id)
            .and_then(|script| script.pop_front());
        next.unwrap_or_else(|| Ok(format!("https://t.me/+{group_id}")))
    }

    async fn bot_member_status(&self, group_id: &str) -> Result<MemberStatus, LinkError> {
        self.statuses
            .get(group_id)
            .cloned()
            .unwrap_or(Ok(MemberStatus::Other))
    }
}

fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn transient() -> LinkError {
    LinkError::Transient("Network error: connection reset".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// All groups succeed: one real link per group, no permission flag
    #[tokio::test(start_paused = true)]
    async fn test_all_groups_succeed() {
        let authority = ScriptedAuthority::default()
            .title("A", "Alpha Lounge")
            .title("B", "Beta Lounge");
        let issuer = LinkIssuer::new(authority);

        let outcome = issuer.issue_links(&ids(&["A", "B"])).await;

        assert!(!outcome.permission_missing);
        assert!(outcome.all_succeeded());
        assert_eq!(outcome.links.len(), 2);
        assert_eq!(outcome.links[0].group_name, "Alpha Lounge");
        assert_eq!(outcome.links[0].link, "https://t.me/+A");
        assert_eq!(outcome.links[1].group_name, "Beta Lounge");
        assert!(outcome.links.iter().all(|l| l.link != FAILED_LINK_MARKER));
    }

    /// Mixed scenario: success, permission failure, missing group
    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcomes_keep_order_and_set_flag() {
        let authority = ScriptedAuthority::default()
            .title("A", "Alpha")
            .script(
                "B",
                vec![Err(LinkError::Permission(
                    "Bad Request: not enough rights to manage chat invite link".to_string(),
                ))],
            )
            .script(
                "C",
                vec![Err(LinkError::NotFound("Bad Request: chat not found".to_string()))],
            );
        let issuer = LinkIssuer::new(authority);

        let outcome = issuer.issue_links(&ids(&["A", "B", "C"])).await;

        assert!(outcome.permission_missing);
        let order: Vec<&str> = outcome.links.iter().map(|l| l.group_id.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);

        assert_eq!(outcome.links[0].link, "https://t.me/+A");
        assert!(outcome.links[1].is_failure());
        assert_eq!(outcome.links[1].group_name, "Group B (Error)");
        assert!(outcome.links[2].is_failure());
        assert_eq!(outcome.success_count(), 1);
        assert_eq!(outcome.failed_count(), 2);

        // Terminal errors are never retried
        assert_eq!(issuer.authority().attempts("B"), 1);
        assert_eq!(issuer.authority().attempts("C"), 1);
    }

    /// Ejection is terminal and does not count as a permission problem
    #[tokio::test(start_paused = true)]
    async fn test_ejected_is_terminal_without_flag() {
        let authority = ScriptedAuthority::default().script(
            "K",
            vec![Err(LinkError::Ejected(
                "Forbidden: bot was kicked from the supergroup chat".to_string(),
            ))],
        );
        let issuer = LinkIssuer::new(authority);

        let outcome = issuer.issue_links(&ids(&["K"])).await;

        assert!(!outcome.permission_missing);
        assert!(outcome.links[0].is_failure());
        assert_eq!(issuer.authority().attempts("K"), 1);
    }

    /// Two transient failures then success looks exactly like a first-try success
    #[tokio::test(start_paused = true)]
    async fn test_retry_is_transparent() {
        let flaky = ScriptedAuthority::default()
            .title("G", "Gold")
            .script("G", vec![Err(transient()), Err(transient())]);
        let steady = ScriptedAuthority::default().title("G", "Gold");

        let retried = LinkIssuer::new(flaky);
        let first_try = LinkIssuer::new(steady);

        let retried_outcome = retried.issue_links(&ids(&["G"])).await;
        let first_try_outcome = first_try.issue_links(&ids(&["G"])).await;

        assert_eq!(retried_outcome, first_try_outcome);
        assert_eq!(retried.authority().attempts("G"), 3);
        assert_eq!(first_try.authority().attempts("G"), 1);
    }

    /// Every attempt uses a fresh label, a one hour expiry and a single use
    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_gets_fresh_label() {
        let authority =
            ScriptedAuthority::default().script("G", vec![Err(transient()), Err(transient())]);
        let issuer = LinkIssuer::new(authority);

        issuer.issue_links(&ids(&["G"])).await;

        let labels = issuer.authority().labels("G");
        assert_eq!(labels.len(), 3);
        assert!(labels.iter().all(|label| label.starts_with("VIP-")));
        assert_ne!(labels[0], labels[1]);
        assert_ne!(labels[1], labels[2]);
        assert_ne!(labels[0], labels[2]);

        let specs = issuer.authority().specs.lock().unwrap();
        for (_, spec) in specs.iter() {
            assert_eq!(spec.member_limit, 1);
        }
    }

    /// Running out of attempts on transient errors fails without the permission flag
    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries() {
        let authority = ScriptedAuthority::default().script(
            "G",
            vec![Err(transient()), Err(transient()), Err(transient())],
        );
        let issuer = LinkIssuer::new(authority);

        let start = tokio::time::Instant::now();
        let outcome = issuer.issue_links(&ids(&["G"])).await;

        assert!(outcome.links[0].is_failure());
        assert!(!outcome.permission_missing);
        assert_eq!(issuer.authority().attempts("G"), 3);
        // 1s + 2s of backoff between the three attempts
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    /// Throttling waits for the delay the authority asked for
    #[tokio::test(start_paused = true)]
    async fn test_throttle_delay_is_honoured() {
        let throttled = || LinkError::Throttled {
            message: "Too Many Requests: retry after 2".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        };
        let authority = ScriptedAuthority::default()
            .title("X", "Xtra")
            .script("X", vec![Err(throttled()), Err(throttled())]);
        let issuer = LinkIssuer::new(authority);

        let start = tokio::time::Instant::now();
        let outcome = issuer.issue_links(&ids(&["X"])).await;

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.links[0].link, "https://t.me/+X");
        assert_eq!(issuer.authority().attempts("X"), 3);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    /// A long throttle hint overrides the 10 second cap
    #[tokio::test(start_paused = true)]
    async fn test_long_throttle_hint_is_not_capped() {
        let authority = ScriptedAuthority::default().script(
            "X",
            vec![Err(LinkError::Throttled {
                message: "Too Many Requests: retry after 30".to_string(),
                retry_after: Some(Duration::from_secs(30)),
            })],
        );
        let issuer = LinkIssuer::new(authority);

        let start = tokio::time::Instant::now();
        let outcome = issuer.issue_links(&ids(&["X"])).await;

        assert!(outcome.all_succeeded());
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    /// A failing title lookup only changes the display name
    #[tokio::test(start_paused = true)]
    async fn test_title_failure_uses_fallback_name() {
        let authority = ScriptedAuthority::default()
            .title_error("A", transient())
            .title("B", "   ");
        let issuer = LinkIssuer::new(authority);

        let outcome = issuer.issue_links(&ids(&["A", "B", "C"])).await;

        assert!(outcome.all_succeeded());
        assert_eq!(outcome.links[0].group_name, "Group A");
        assert_eq!(outcome.links[1].group_name, "Group B");
        assert_eq!(outcome.links[2].group_name, "Group C");
    }

    /// Output order follows input order, not completion order
    #[tokio::test(start_paused = true)]
    async fn test_order_independent_of_completion() {
        let authority = ScriptedAuthority::default()
            .latency("slow", Duration::from_secs(5))
            .latency("medium", Duration::from_secs(1));
        let issuer = LinkIssuer::new(authority);

        let start = tokio::time::Instant::now();
        let outcome = issuer.issue_links(&ids(&["slow", "medium", "fast"])).await;

        let order: Vec<&str> = outcome.links.iter().map(|l| l.group_id.as_str()).collect();
        assert_eq!(order, vec!["slow", "medium", "fast"]);
        // Branches run concurrently: total time is the slowest branch, not the sum
        assert!(start.elapsed() < Duration::from_secs(6));
    }

    /// A slow retrying branch does not hold back or disturb its siblings
    #[tokio::test(start_paused = true)]
    async fn test_branches_are_isolated() {
        let authority = ScriptedAuthority::default()
            .script("bad", vec![Err(transient()), Err(transient()), Err(transient())])
            .script(
                "denied",
                vec![Err(LinkError::Permission("not enough rights".to_string()))],
            );
        let issuer = LinkIssuer::new(authority);

        let outcome = issuer.issue_links(&ids(&["ok", "bad", "denied", "ok2"])).await;

        assert_eq!(outcome.links.len(), 4);
        assert!(!outcome.links[0].is_failure());
        assert!(outcome.links[1].is_failure());
        assert!(outcome.links[2].is_failure());
        assert!(!outcome.links[3].is_failure());
        assert!(outcome.permission_missing);
        assert_eq!(issuer.authority().attempts("ok"), 1);
        assert_eq!(issuer.authority().attempts("bad"), 3);
    }

    /// Duplicate ids are issued independently
    #[tokio::test(start_paused = true)]
    async fn test_duplicate_ids() {
        let issuer = LinkIssuer::new(ScriptedAuthority::default());

        let outcome = issuer.issue_links(&ids(&["D", "D"])).await;

        assert_eq!(outcome.links.len(), 2);
        assert!(outcome.all_succeeded());
        assert_eq!(issuer.authority().attempts("D"), 2);
    }

    /// Startup permission check reports every group and never fails
    #[tokio::test(start_paused = true)]
    async fn test_check_permissions() {
        let authority = ScriptedAuthority::default()
            .title("A", "Alpha")
            .status("A", Ok(MemberStatus::Administrator { can_invite_users: true }))
            .status("B", Ok(MemberStatus::Other))
            .status("C", Err(LinkError::NotFound("chat not found".to_string())));
        let issuer = LinkIssuer::new(authority);

        let reports = issuer.check_permissions(&ids(&["A", "B", "C"])).await;

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].group_name.as_deref(), Some("Alpha"));
        assert!(reports[0].status.as_ref().unwrap().can_invite());
        assert!(!reports[1].status.as_ref().unwrap().can_invite());
        assert!(reports[2].status.is_err());
    }
}
