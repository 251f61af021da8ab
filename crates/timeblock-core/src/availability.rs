//! Removal of slots that collide with busy periods.

use crate::time::{BusyPeriod, TimeSlot};

/// Keeps the slots that overlap no busy period, in their original order.
///
/// Overlap is half-open: a slot ending exactly when a busy period starts
/// (or starting when one ends) is kept.
pub fn filter_free(slots: &[TimeSlot], busy: &[BusyPeriod]) -> Vec<TimeSlot> {
    slots
        .iter()
        .filter(|slot| !busy.iter().any(|period| slot.overlaps(period)))
        .copied()
        .collect()
}
