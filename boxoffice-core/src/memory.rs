//! In-memory `BookingRepository`, used by tests and when no database is
//! configured. All writes of a combined operation happen under one write
//! lock, which gives the same all-or-nothing behavior as a transaction.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;
use boxoffice_shared::{Booking, BookingDetails, BookingFilter, BookingStatus, Event, EventSummary};

use crate::repository::{BookingRepository, Cancellation, RepoResult};

#[derive(Default)]
struct State {
    events: HashMap<Uuid, Event>,
    // Insertion order doubles as listing order
    bookings: Vec<Booking>,
    booking_index: HashMap<Uuid, usize>,
}

impl State {
    fn live_event_mut(&mut self, id: Uuid) -> Option<&mut Event> {
        self.events.get_mut(&id).filter(|e| !e.is_deleted())
    }

    fn live_booking_mut(&mut self, id: Uuid) -> Option<&mut Booking> {
        let idx = *self.booking_index.get(&id)?;
        self.bookings.get_mut(idx).filter(|b| b.is_live())
    }

    fn insert_booking(&mut self, booking: Booking) {
        self.booking_index.insert(booking.id, self.bookings.len());
        self.bookings.push(booking);
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    state: RwLock<State>,
}

impl InMemoryBookingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored booking including soft-deleted ones (test helper)
    pub fn all_bookings(&self) -> Vec<Booking> {
        self.state.read().bookings.clone()
    }

    /// Raw event row including soft-deleted ones (test helper)
    pub fn raw_event(&self, id: Uuid) -> Option<Event> {
        self.state.read().events.get(&id).cloned()
    }
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn create_event(&self, event: &Event) -> RepoResult<Event> {
        let mut state = self.state.write();
        if state.events.contains_key(&event.id) {
            return Err(format!("Event {} already exists", event.id).into());
        }
        state.events.insert(event.id, event.clone());
        Ok(event.clone())
    }

    async fn get_event(&self, id: Uuid) -> RepoResult<Option<Event>> {
        Ok(self
            .state
            .read()
            .events
            .get(&id)
            .filter(|e| !e.is_deleted())
            .cloned())
    }

    async fn save_event(&self, event: &Event) -> RepoResult<()> {
        let mut state = self.state.write();
        let stored = state
            .events
            .get_mut(&event.id)
            .ok_or_else(|| format!("Event {} does not exist", event.id))?;
        *stored = event.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    async fn create_booking(
        &self,
        event_id: Uuid,
        user_id: &str,
        status: BookingStatus,
    ) -> RepoResult<Booking> {
        let mut state = self.state.write();
        if !state.events.contains_key(&event_id) {
            return Err(format!("Event {} does not exist", event_id).into());
        }
        let booking = Booking::new(event_id, user_id, status);
        state.insert_booking(booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>> {
        let state = self.state.read();
        Ok(state
            .booking_index
            .get(&id)
            .and_then(|idx| state.bookings.get(*idx))
            .filter(|b| b.is_live())
            .cloned())
    }

    async fn soft_delete_booking(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write();
        match state.live_booking_mut(id) {
            Some(booking) => {
                booking.cancel();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepoResult<Vec<BookingDetails>> {
        let state = self.state.read();
        let details = state
            .bookings
            .iter()
            .filter(|b| filter.matches(b))
            .map(|b| BookingDetails {
                booking: b.clone(),
                event: state.events.get(&b.event_id).map(EventSummary::from),
            })
            .collect();
        Ok(details)
    }

    async fn commit_reservation(&self, event_id: Uuid, user_id: &str) -> RepoResult<Option<Booking>> {
        let mut state = self.state.write();
        let Some(event) = state.live_event_mut(event_id) else {
            return Ok(None);
        };
        if event.available_tickets <= 0 {
            return Err(format!("Event {} has no persisted availability", event_id).into());
        }
        event.available_tickets -= 1;
        event.updated_at = Utc::now();

        let booking = Booking::new(event_id, user_id, BookingStatus::Confirmed);
        state.insert_booking(booking.clone());
        Ok(Some(booking))
    }

    async fn commit_cancellation(
        &self,
        booking_id: Uuid,
        promote_to: Option<&str>,
    ) -> RepoResult<Option<Cancellation>> {
        let mut state = self.state.write();
        let Some(booking) = state.live_booking_mut(booking_id) else {
            return Ok(None);
        };
        let event_id = booking.event_id;
        let was_confirmed = booking.status == BookingStatus::Confirmed;

        // Validate before mutating so a failure leaves nothing half-applied
        let event = state
            .live_event_mut(event_id)
            .ok_or_else(|| format!("Event {} does not exist", event_id))?;
        if promote_to.is_none() && was_confirmed && event.available_tickets >= event.total_tickets {
            return Err(format!("Event {} is already at full availability", event_id).into());
        }

        if promote_to.is_none() && was_confirmed {
            event.available_tickets += 1;
        }
        event.updated_at = Utc::now();

        let canceled = match state.live_booking_mut(booking_id) {
            Some(booking) => {
                booking.cancel();
                booking.clone()
            }
            None => return Ok(None),
        };

        let promoted = promote_to.map(|user_id| {
            let booking = Booking::new(event_id, user_id, BookingStatus::Confirmed);
            state.insert_booking(booking.clone());
            booking
        });

        Ok(Some(Cancellation { canceled, promoted }))
    }
}
