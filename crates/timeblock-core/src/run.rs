//! Aggregate outcome of a scheduling run.

use serde::{Deserialize, Serialize};

/// Counters accumulated while a run walks its days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub total_slots: usize,
    pub total_free: usize,
    pub total_created: usize,
    pub days_processed: usize,
    pub days_skipped: usize,
}

impl RunTally {
    /// Produces the final result with its summary message.
    pub fn finish(self, dry_run: bool) -> RunResult {
        let mut message = if dry_run {
            format!(
                "Dry run: {} of {} slots free across {} day(s), no events created",
                self.total_free, self.total_slots, self.days_processed
            )
        } else {
            format!(
                "Created {} of {} slots across {} day(s)",
                self.total_created, self.total_slots, self.days_processed
            )
        };
        if self.days_skipped > 0 {
            message.push_str(&format!(
                ", skipped {} day(s) with no usable time",
                self.days_skipped
            ));
        }

        RunResult {
            total_slots: self.total_slots,
            total_free: self.total_free,
            total_created: self.total_created,
            days_processed: self.days_processed,
            days_skipped: self.days_skipped,
            message,
        }
    }
}

/// The single result reported for one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    /// Slots generated across all days, before filtering.
    pub total_slots: usize,
    /// Slots that survived the busy-period filter.
    pub total_free: usize,
    /// Calendar events actually created.
    pub total_created: usize,
    pub days_processed: usize,
    pub days_skipped: usize,
    pub message: String,
}
