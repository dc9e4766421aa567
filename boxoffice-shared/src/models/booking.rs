use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use super::event::Event;

/// Booking status as stored and returned over the API
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Confirmed,
    Canceled,
    Waitlisted,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Canceled => "CANCELED",
            BookingStatus::Waitlisted => "WAITLISTED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELED" => Ok(BookingStatus::Canceled),
            "WAITLISTED" => Ok(BookingStatus::Waitlisted),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A user's claim on one unit of an event's inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Booking {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn new(event_id: Uuid, user_id: impl Into<String>, status: BookingStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id: user_id.into(),
            status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }

    /// Cancellation soft-deletes the row and flips it to CANCELED
    pub fn cancel(&mut self) {
        let now = Utc::now();
        self.status = BookingStatus::Canceled;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}

/// Event attributes joined onto a listed booking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventSummary {
    pub id: Uuid,
    pub total_tickets: i32,
    pub available_tickets: i32,
}

impl From<&Event> for EventSummary {
    fn from(event: &Event) -> Self {
        Self {
            id: event.id,
            total_tickets: event.total_tickets,
            available_tickets: event.available_tickets,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub event: Option<EventSummary>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingFilter {
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub include_canceled: bool,
}

impl BookingFilter {
    pub fn for_event(event_id: Uuid) -> Self {
        Self {
            event_id: Some(event_id),
            include_canceled: false,
        }
    }

    pub fn with_canceled(mut self) -> Self {
        self.include_canceled = true;
        self
    }

    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(event_id) = self.event_id {
            if booking.event_id != event_id {
                return false;
            }
        }
        self.include_canceled || booking.is_live()
    }
}
