// Weekly reminder logic: who still needs to run GPQ before the
// deadline, and how the guild is tracking against last week. The core
// builds a report; the Discord layer formats and sends it.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::core::roster::week::{self, WeekKey};
use crate::core::roster::{RosterError, RosterStore};

/// Discord caps mentions per message well above this, but huge mention
/// walls get messages flagged, so pings go out in chunks.
pub const MENTION_BATCH_SIZE: usize = 50;

/// Snapshot of the guild's standing for the reminder message.
#[derive(Debug, Clone)]
pub struct ReminderReport {
    pub week: WeekKey,
    /// Discord IDs of linked members with no score this week.
    pub missing: Vec<u64>,
    pub last_week_total: u64,
    pub current_total: u64,
}

impl ReminderReport {
    pub fn everyone_done(&self) -> bool {
        self.missing.is_empty()
    }

    /// Percent change of the running total against last week's final
    /// total. `None` when last week has no data to compare against.
    pub fn delta_percent(&self) -> Option<i64> {
        if self.last_week_total == 0 {
            return None;
        }
        let delta = self.current_total as f64 - self.last_week_total as f64;
        Some((delta / self.last_week_total as f64 * 100.0).round() as i64)
    }
}

pub struct ReminderService<S: RosterStore> {
    store: Arc<S>,
    /// Minimum gap between reminder dispatches. Protects against the
    /// scheduler waking up twice around the same Wednesday midnight.
    safety_window: Duration,
    last_trigger: Mutex<Option<Instant>>,
}

impl<S: RosterStore> ReminderService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            safety_window: Duration::from_secs(60 * 60),
            last_trigger: Mutex::new(None),
        }
    }

    /// Claims a dispatch slot. Returns false when a reminder already
    /// went out within the safety window.
    pub fn try_acquire(&self) -> bool {
        let mut last = match self.last_trigger.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        if let Some(prev) = *last {
            if now.duration_since(prev) < self.safety_window {
                return false;
            }
        }
        *last = Some(now);
        true
    }

    pub async fn build_report(&self, now: DateTime<Utc>) -> Result<ReminderReport, RosterError> {
        let current = week::current_week(now);
        let previous = week::last_week(now);

        let current_scores = self.store.scores_for_week(&current).await?;
        let previous_scores = self.store.scores_for_week(&previous).await?;

        let missing = current_scores
            .iter()
            .filter(|(_, score)| score.unwrap_or(0) == 0)
            .filter_map(|(player, _)| player.discord_id)
            .collect();

        let current_total = current_scores
            .iter()
            .filter_map(|(_, s)| *s)
            .sum();
        let last_week_total = previous_scores.iter().filter_map(|(_, s)| *s).sum();

        Ok(ReminderReport {
            week: current,
            missing,
            last_week_total,
            current_total,
        })
    }
}

/// Splits a slice into chunks for batched mention messages.
pub fn batches<T: Clone>(items: &[T], size: usize) -> Vec<Vec<T>> {
    items.chunks(size.max(1)).map(|c| c.to_vec()).collect()
}
