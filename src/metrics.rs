//! # Metrics Module
//!
//! In-memory counters for link generation requests. Reset on restart.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
    total_links_generated: u64,
    total_requests: u64,
    successful_generations: u64,
    failed_generations: u64,
    average_response_time_ms: f64,
    requests_by_user: HashMap<u64, u64>,
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_links_generated: u64,
    pub total_requests: u64,
    pub successful_generations: u64,
    pub failed_generations: u64,
    pub average_response_time_ms: f64,
    pub uptime_secs: u64,
    pub last_reset: DateTime<Utc>,
}

impl MetricsSnapshot {
    /// Percentage of successful generations, 0.0 when nothing was recorded
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.successful_generations as f64 / self.total_requests as f64 * 100.0
        }
    }
}

/// Thread-safe metrics store shared by all handlers
#[derive(Debug)]
pub struct MetricsService {
    counters: Mutex<Counters>,
    last_reset: Mutex<DateTime<Utc>>,
    started_at: Instant,
}

impl MetricsService {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(Counters::default()),
            last_reset: Mutex::new(Utc::now()),
            started_at: Instant::now(),
        }
    }

    /// Record one `/generate` request
    pub fn record_link_generation(&self, user_id: u64, link_count: usize, duration: Duration, failed: bool) {
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        counters.total_requests += 1;

        if failed {
            counters.failed_generations += 1;
        } else {
            counters.total_links_generated += link_count as u64;
            counters.successful_generations += 1;
        }

        *counters.requests_by_user.entry(user_id).or_insert(0) += 1;

        // Moving average over all requests
        let n = counters.total_requests as f64;
        let duration_ms = duration.as_secs_f64() * 1000.0;
        counters.average_response_time_ms =
            (counters.average_response_time_ms * (n - 1.0) + duration_ms) / n;
    }

    pub fn stats(&self) -> MetricsSnapshot {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let last_reset = *self.last_reset.lock().unwrap_or_else(|e| e.into_inner());

        MetricsSnapshot {
            total_links_generated: counters.total_links_generated,
            total_requests: counters.total_requests,
            successful_generations: counters.successful_generations,
            failed_generations: counters.failed_generations,
            average_response_time_ms: counters.average_response_time_ms,
            uptime_secs: self.started_at.elapsed().as_secs(),
            last_reset,
        }
    }

    /// Users with the most requests, highest first. Ties are ordered by user id.
    pub fn top_users(&self, limit: usize) -> Vec<(u64, u64)> {
        let counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let mut users: Vec<(u64, u64)> = counters
            .requests_by_user
            .iter()
            .map(|(user, count)| (*user, *count))
            .collect();
        users.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        users.truncate(limit);
        users
    }

    pub fn reset(&self) {
        *self.counters.lock().unwrap_or_else(|e| e.into_inner()) = Counters::default();
        *self.last_reset.lock().unwrap_or_else(|e| e.into_inner()) = Utc::now();
    }
}

impl Default for MetricsService {
    fn default() -> Self {
        Self::new()
    }
}
