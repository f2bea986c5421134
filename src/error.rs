use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Slot {slot_id} is busy in the teacher's calendar")]
    SlotBusy { slot_id: String },
    #[error("A meeting at {time} on {date} is already booked")]
    AlreadyBooked { date: NaiveDate, time: String },
    #[error("Slot {slot_id} is not offered on the selected day")]
    UnknownSlot { slot_id: String },
    #[error("Booking {id} does not exist and can therefore not be cancelled")]
    UnknownBooking { id: Uuid },
    #[error("No day has been selected yet")]
    NoDaySelected,
    #[error("Calendar unavailable: {0}")]
    CalendarUnavailable(String),
}

#[derive(Debug, Error)]
pub enum PortalError {
    #[error("request to table {table} failed: {source}")]
    Request {
        table: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("table {table} answered with status {status}")]
    Status { table: String, status: u16 },
    #[error("failed to decode rows of table {table}: {source}")]
    Decode {
        table: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    EmptyUpload(String),
    #[error("no {table} row matches {key}")]
    NotFound { table: String, key: String },
}
