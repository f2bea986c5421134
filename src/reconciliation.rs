use crate::types::{Booking, DaySchedule, DaySummary, Slot, SlotStatus, SlotView};
use chrono::NaiveDate;

/// Merges the day's roster with the session's bookings.
///
/// Only bookings for `date` are considered. Output keeps roster order.
pub fn reconcile(date: NaiveDate, slots: &[Slot], bookings: &[Booking]) -> DaySchedule {
    let slots: Vec<SlotView> = slots
        .iter()
        .map(|slot| SlotView {
            slot_id: slot.id.clone(),
            time: slot.time.clone(),
            status: slot_status(date, slot, bookings),
        })
        .collect();
    let available = slots
        .iter()
        .filter(|slot| slot.status == SlotStatus::Available)
        .count();

    DaySchedule {
        date,
        slots,
        available,
    }
}

pub fn slot_status(date: NaiveDate, slot: &Slot, bookings: &[Booking]) -> SlotStatus {
    let booked_by_you = bookings
        .iter()
        .any(|booking| booking.date == date && booking.time == slot.time);

    if booked_by_you {
        SlotStatus::BookedByYou
    } else if slot.is_booked {
        SlotStatus::Unavailable
    } else {
        SlotStatus::Available
    }
}

/// Date picker entry. Counts slots that are free in the calendar, own bookings
/// included.
pub fn summarize(date: NaiveDate, slots: &[Slot]) -> DaySummary {
    DaySummary {
        date,
        available: slots.iter().filter(|slot| !slot.is_booked).count(),
    }
}
