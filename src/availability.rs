use crate::{error::SchedulerError, types::Slot};
use chrono::{Datelike, NaiveDate, Weekday};

/// Daily roster in 15 minute steps, morning block then afternoon block.
pub const STANDARD_SLOTS: [&str; 20] = [
    "09:00 AM", "09:15 AM", "09:30 AM", "09:45 AM", "10:00 AM", "10:15 AM", "10:30 AM", "10:45 AM",
    "11:00 AM", "11:15 AM", "11:30 AM", "11:45 AM", "02:00 PM", "02:15 PM", "02:30 PM", "02:45 PM",
    "03:00 PM", "03:15 PM", "03:30 PM", "03:45 PM",
];

const BUSY_EVERY: u32 = 5;

/// Source of free/busy information for the teacher's calendar.
///
/// The seeded calendar below stands in for a real external calendar. Any
/// implementation must return the slots of a day in roster order.
#[cfg_attr(test, mockall::automock)]
pub trait AvailabilityProvider: Send + Sync + 'static {
    fn slots_for(&self, date: NaiveDate) -> Result<Vec<Slot>, SchedulerError>;
}

/// Deterministic stand-in for an external calendar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeededCalendar;

impl AvailabilityProvider for SeededCalendar {
    fn slots_for(&self, date: NaiveDate) -> Result<Vec<Slot>, SchedulerError> {
        if is_weekend(date) {
            return Ok(vec![]);
        }

        let key = date_key(date);
        let seed = date_seed(&key);

        Ok(STANDARD_SLOTS
            .iter()
            .enumerate()
            .map(|(index, time)| Slot {
                id: slot_id(&key, time),
                time: time.to_string(),
                is_booked: (seed + index as u32) % BUSY_EVERY == 0,
                booked_by_current_user: false,
            })
            .collect())
    }
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Sum of the character codes of the ISO date string.
pub fn date_seed(key: &str) -> u32 {
    key.chars().map(|c| c as u32).sum()
}

/// `2024-06-17` and `09:00 AM` become `2024-06-17-0900AM`.
pub fn slot_id(key: &str, time: &str) -> String {
    let compact: String = time
        .chars()
        .filter(|c| *c != ':' && !c.is_whitespace())
        .collect();
    format!("{key}-{compact}")
}
