use crate::{
    error::SchedulerError,
    types::{Booking, Slot},
};
use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use tokio::sync::watch::{self, Sender};
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info};
use uuid::Uuid;

/// In-memory record of the bookings made within one session.
///
/// Holds at most one booking per (date, time). Every successful mutation
/// publishes the full booking list to subscribers of [`BookingLedger::booking_stream`].
#[derive(Debug, Clone)]
pub struct BookingLedger {
    bookings: Arc<Mutex<Vec<Booking>>>,
    sender: Sender<Vec<Booking>>,
}

impl Default for BookingLedger {
    fn default() -> Self {
        let (sender, _) = watch::channel(vec![]);
        Self {
            bookings: Arc::new(Mutex::default()),
            sender,
        }
    }
}

impl BookingLedger {
    pub fn bookings(&self) -> Vec<Booking> {
        self.bookings.lock().unwrap().clone()
    }

    pub fn bookings_on(&self, date: NaiveDate) -> Vec<Booking> {
        self.bookings
            .lock()
            .unwrap()
            .iter()
            .filter(|booking| booking.date == date)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bookings.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn book(&self, date: NaiveDate, slot: &Slot) -> Result<Booking, SchedulerError> {
        let booking = {
            let mut bookings = self.bookings.lock().unwrap();
            if slot.is_booked {
                let err = SchedulerError::SlotBusy {
                    slot_id: slot.id.clone(),
                };
                error!(%err, "Booking rejected");
                return Err(err);
            }
            if bookings
                .iter()
                .any(|booking| booking.date == date && booking.time == slot.time)
            {
                let err = SchedulerError::AlreadyBooked {
                    date,
                    time: slot.time.clone(),
                };
                error!(%err, "Booking rejected");
                return Err(err);
            }

            let booking = Booking {
                id: Uuid::new_v4(),
                date,
                time: slot.time.clone(),
                slot_id: slot.id.clone(),
            };
            bookings.push(booking.clone());
            booking
        };

        info!(id = %booking.id, %date, time = %booking.time, "Meeting booked");
        self.send_bookings();
        Ok(booking)
    }

    pub fn cancel(&self, id: Uuid) -> Result<Booking, SchedulerError> {
        let cancelled = {
            let mut bookings = self.bookings.lock().unwrap();
            match bookings.iter().position(|booking| booking.id == id) {
                Some(index) => bookings.remove(index),
                None => {
                    let err = SchedulerError::UnknownBooking { id };
                    error!(%err, "Cancellation rejected");
                    return Err(err);
                }
            }
        };

        info!(%id, date = %cancelled.date, time = %cancelled.time, "Meeting cancelled");
        self.send_bookings();
        Ok(cancelled)
    }

    /// Stream of booking list snapshots, starting with the current list.
    pub fn booking_stream(&self) -> WatchStream<Vec<Booking>> {
        WatchStream::new(self.sender.subscribe())
    }

    fn send_bookings(&self) {
        let bookings = self.bookings();
        self.sender.send_replace(bookings);
    }
}
