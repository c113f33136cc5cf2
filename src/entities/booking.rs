// 📅 Booking Event - Event log row, consumed only in aggregate

use crate::normalize::{normalize_email, parse_event_date};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ============================================================================
// BOOKING STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Confirmed,
    Attended,
    Cancelled,
    NoShow,

    /// Anything the vendor export invents that we don't recognize
    Other(String),
}

impl BookingStatus {
    /// Case-insensitive, whitespace-tolerant parse. Never fails.
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim().to_lowercase();
        match s.as_str() {
            "confirmed" => BookingStatus::Confirmed,
            "attended" => BookingStatus::Attended,
            "cancelled" | "canceled" => BookingStatus::Cancelled,
            "no_show" | "noshow" | "no show" | "no-show" => BookingStatus::NoShow,
            _ => BookingStatus::Other(s),
        }
    }

    /// Counted statuses mark a visit that actually happened
    pub fn is_counted(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Attended)
    }

    pub fn as_str(&self) -> &str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Attended => "attended",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no_show",
            BookingStatus::Other(s) => s.as_str(),
        }
    }
}

// ============================================================================
// BOOKING EVENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingEvent {
    pub id: String,

    /// Lowercased + trimmed
    pub email: String,

    pub status: BookingStatus,

    /// None when the source date was missing or unparseable
    pub date: Option<NaiveDateTime>,
}

impl BookingEvent {
    pub fn new(id: &str, email: &str, status: &str, date: &str) -> Self {
        BookingEvent {
            id: id.trim().to_string(),
            email: normalize_email(Some(email)),
            status: BookingStatus::parse(status),
            date: parse_event_date(date),
        }
    }

    pub fn is_counted(&self) -> bool {
        self.status.is_counted()
    }
}
