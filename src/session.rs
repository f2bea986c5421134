use crate::{
    availability::AvailabilityProvider,
    error::SchedulerError,
    ledger::BookingLedger,
    reconciliation::{reconcile, summarize},
    types::{ActiveTab, Booking, DaySchedule, DaySummary, Slot},
};
use chrono::{Duration as DateDuration, NaiveDate};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::time::sleep;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Default)]
struct SessionState {
    selected_date: Option<NaiveDate>,
    slots: Vec<Slot>,
    active_tab: ActiveTab,
    latest_ticket: u64,
}

/// Handed out for every day fetch. Only the most recently issued ticket may
/// replace the displayed day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    date: NaiveDate,
}

impl FetchTicket {
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(DaySchedule),
    Stale,
}

/// One parent's meeting scheduler: the displayed day, the active tab and the
/// ledger of bookings made so far.
pub struct SchedulerSession<P: AvailabilityProvider> {
    provider: Arc<P>,
    ledger: BookingLedger,
    state: Arc<Mutex<SessionState>>,
    fetch_delay: Duration,
}

impl<P: AvailabilityProvider> Clone for SchedulerSession<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            ledger: self.ledger.clone(),
            state: self.state.clone(),
            fetch_delay: self.fetch_delay,
        }
    }
}

impl<P: AvailabilityProvider> SchedulerSession<P> {
    pub fn new(provider: Arc<P>, fetch_delay: Duration) -> Self {
        Self {
            provider,
            ledger: BookingLedger::default(),
            state: Arc::new(Mutex::default()),
            fetch_delay,
        }
    }

    /// Loads `date` after the simulated fetch delay. A response is only
    /// displayed if no newer `select_date` was issued in the meantime.
    pub async fn select_date(&self, date: NaiveDate) -> Result<FetchOutcome, SchedulerError> {
        let ticket = self.begin_fetch(date);
        if !self.fetch_delay.is_zero() {
            sleep(self.fetch_delay).await;
        }
        let slots = self.provider.slots_for(date)?;

        Ok(match self.complete_fetch(ticket, slots) {
            Some(schedule) => FetchOutcome::Applied(schedule),
            None => FetchOutcome::Stale,
        })
    }

    pub fn begin_fetch(&self, date: NaiveDate) -> FetchTicket {
        let mut state = self.state.lock().unwrap();
        state.latest_ticket += 1;
        FetchTicket {
            seq: state.latest_ticket,
            date,
        }
    }

    /// Displays `slots` and returns the resulting day. Returns `None` and
    /// drops `slots` when a newer fetch has been issued.
    pub fn complete_fetch(&self, ticket: FetchTicket, mut slots: Vec<Slot>) -> Option<DaySchedule> {
        let mut state = self.state.lock().unwrap();
        if ticket.seq != state.latest_ticket {
            warn!(
                date = %ticket.date,
                ticket = ticket.seq,
                latest = state.latest_ticket,
                "Discarding stale slot response"
            );
            return None;
        }

        let bookings = self.ledger.bookings_on(ticket.date);
        for slot in slots.iter_mut() {
            slot.booked_by_current_user = bookings.iter().any(|booking| booking.time == slot.time);
        }
        state.selected_date = Some(ticket.date);
        state.slots = slots;
        Some(reconcile(ticket.date, &state.slots, &bookings))
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.state.lock().unwrap().selected_date
    }

    pub fn slots(&self) -> Vec<Slot> {
        self.state.lock().unwrap().slots.clone()
    }

    pub fn active_tab(&self) -> ActiveTab {
        self.state.lock().unwrap().active_tab
    }

    pub fn set_active_tab(&self, tab: ActiveTab) {
        self.state.lock().unwrap().active_tab = tab;
    }

    pub fn day_view(&self) -> Option<DaySchedule> {
        let state = self.state.lock().unwrap();
        let date = state.selected_date?;
        let bookings = self.ledger.bookings_on(date);
        Some(reconcile(date, &state.slots, &bookings))
    }

    pub fn book(&self, slot_id: &str) -> Result<Booking, SchedulerError> {
        let mut state = self.state.lock().unwrap();
        let date = state.selected_date.ok_or(SchedulerError::NoDaySelected)?;
        let slot = state
            .slots
            .iter_mut()
            .find(|slot| slot.id == slot_id)
            .ok_or_else(|| SchedulerError::UnknownSlot {
                slot_id: slot_id.into(),
            })?;

        let booking = self.ledger.book(date, slot)?;
        slot.booked_by_current_user = true;
        Ok(booking)
    }

    /// Clears the local flag of the displayed day's slot. The slot falls back
    /// to the calendar's busy flag, which is not re-queried.
    pub fn cancel(&self, booking_id: Uuid) -> Result<Booking, SchedulerError> {
        let cancelled = self.ledger.cancel(booking_id)?;

        let mut state = self.state.lock().unwrap();
        if state.selected_date == Some(cancelled.date) {
            if let Some(slot) = state
                .slots
                .iter_mut()
                .find(|slot| slot.time == cancelled.time)
            {
                slot.booked_by_current_user = false;
            }
        }
        Ok(cancelled)
    }

    /// Cancels the booking and returns to the booking tab. No replacement
    /// booking is made.
    pub fn reschedule(&self, booking_id: Uuid) -> Result<Booking, SchedulerError> {
        let cancelled = self.cancel(booking_id)?;
        self.set_active_tab(ActiveTab::Book);
        info!(id = %booking_id, "Meeting released for rescheduling");
        Ok(cancelled)
    }

    pub fn my_meetings(&self) -> Vec<Booking> {
        self.ledger.bookings()
    }

    pub fn meeting_count(&self) -> usize {
        self.ledger.len()
    }

    /// Date picker entries for `days` consecutive days starting at `from`.
    pub fn overview(&self, from: NaiveDate, days: u32) -> Result<Vec<DaySummary>, SchedulerError> {
        (0..days)
            .map(|offset| {
                let date = from + DateDuration::days(offset.into());
                let slots = self.provider.slots_for(date)?;
                Ok(summarize(date, &slots))
            })
            .collect()
    }

    pub fn booking_stream(&self) -> WatchStream<Vec<Booking>> {
        self.ledger.booking_stream()
    }
}

struct RegisteredSession<P: AvailabilityProvider> {
    session: SchedulerSession<P>,
    last_used: Instant,
}

/// Sessions by id. Sessions share the availability provider and nothing else.
///
/// A session unused for longer than the idle timeout is evicted the next time
/// a session is created. Evicting a session ends its booking streams.
pub struct SessionRegistry<P: AvailabilityProvider> {
    provider: Arc<P>,
    fetch_delay: Duration,
    idle_timeout: Duration,
    sessions: Arc<Mutex<HashMap<Uuid, RegisteredSession<P>>>>,
}

impl<P: AvailabilityProvider> Clone for SessionRegistry<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            fetch_delay: self.fetch_delay,
            idle_timeout: self.idle_timeout,
            sessions: self.sessions.clone(),
        }
    }
}

impl<P: AvailabilityProvider> SessionRegistry<P> {
    pub fn new(provider: P, fetch_delay: Duration, idle_timeout: Duration) -> Self {
        Self {
            provider: Arc::new(provider),
            fetch_delay,
            idle_timeout,
            sessions: Arc::new(Mutex::default()),
        }
    }

    pub fn create(&self) -> (Uuid, SchedulerSession<P>) {
        let id = Uuid::new_v4();
        let session = SchedulerSession::new(self.provider.clone(), self.fetch_delay);

        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, entry| entry.last_used.elapsed() < self.idle_timeout);
        if sessions.len() < before {
            info!(evicted = before - sessions.len(), "Idle scheduler sessions evicted");
        }
        sessions.insert(
            id,
            RegisteredSession {
                session: session.clone(),
                last_used: Instant::now(),
            },
        );
        info!(%id, "Scheduler session created");
        (id, session)
    }

    /// Looks up a session and marks it as used.
    pub fn get(&self, id: Uuid) -> Option<SchedulerSession<P>> {
        let mut sessions = self.sessions.lock().unwrap();
        let entry = sessions.get_mut(&id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    pub fn remove(&self, id: Uuid) -> Option<SchedulerSession<P>> {
        let removed = self.sessions.lock().unwrap().remove(&id)?;
        info!(%id, "Scheduler session closed");
        Some(removed.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
