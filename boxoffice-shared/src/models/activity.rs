use uuid::Uuid;

/// State transitions broadcast to in-process subscribers (SSE feed)
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BookingActivity {
    TicketBooked {
        event_id: Uuid,
        booking_id: Uuid,
        user_id: String,
        timestamp: i64,
    },
    Waitlisted {
        event_id: Uuid,
        user_id: String,
        position: usize,
        timestamp: i64,
    },
    BookingCanceled {
        event_id: Uuid,
        booking_id: Uuid,
        user_id: String,
        timestamp: i64,
    },
    WaitlistPromoted {
        event_id: Uuid,
        booking_id: Uuid,
        user_id: String,
        timestamp: i64,
    },
    TicketReleased {
        event_id: Uuid,
        available_tickets: i32,
        timestamp: i64,
    },
}

impl BookingActivity {
    pub fn event_id(&self) -> Uuid {
        match self {
            BookingActivity::TicketBooked { event_id, .. }
            | BookingActivity::Waitlisted { event_id, .. }
            | BookingActivity::BookingCanceled { event_id, .. }
            | BookingActivity::WaitlistPromoted { event_id, .. }
            | BookingActivity::TicketReleased { event_id, .. } => *event_id,
        }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            BookingActivity::TicketBooked { .. } => "ticket_booked",
            BookingActivity::Waitlisted { .. } => "waitlisted",
            BookingActivity::BookingCanceled { .. } => "booking_canceled",
            BookingActivity::WaitlistPromoted { .. } => "waitlist_promoted",
            BookingActivity::TicketReleased { .. } => "ticket_released",
        }
    }
}
