use crate::events::Timestamp;
use chrono::{Duration, Utc};
use std::collections::VecDeque;

/// Rate limiter for operator alerts
///
/// Tracks recently delivered alerts and enforces a maximum count per sliding
/// one-minute window. Every check takes the instant to evaluate at, so callers
/// and tests control the clock.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum number of alerts allowed per minute
    max_per_minute: usize,
    /// Delivery times of recent alerts
    recent: VecDeque<Timestamp>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(3)
    }
}

impl RateLimiter {
    pub fn new(max_per_minute: usize) -> Self {
        Self {
            max_per_minute,
            recent: VecDeque::new(),
        }
    }

    /// Whether an alert may be delivered at `now`
    pub fn can_send_at(&mut self, now: Timestamp) -> bool {
        self.expire(now);
        self.recent.len() < self.max_per_minute
    }

    pub fn can_send(&mut self) -> bool {
        self.can_send_at(Utc::now())
    }

    /// Record a delivery made at `timestamp`
    pub fn record_at(&mut self, timestamp: Timestamp) {
        self.recent.push_back(timestamp);
    }

    /// Number of deliveries inside the minute ending at `now`
    pub fn current_count_at(&mut self, now: Timestamp) -> usize {
        self.expire(now);
        self.recent.len()
    }

    // Deliveries may be recorded out of order, so scan the whole queue
    fn expire(&mut self, now: Timestamp) {
        let cutoff = now - Duration::minutes(1);
        self.recent.retain(|&time| time > cutoff);
    }
}
