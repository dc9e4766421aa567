use async_trait::async_trait;
use uuid::Uuid;
use boxoffice_shared::{Booking, BookingDetails, BookingFilter, BookingStatus, Event};

pub type RepoResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Result of a committed cancellation
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub canceled: Booking,
    pub promoted: Option<Booking>,
}

/// Durable storage for events and bookings.
///
/// Lookups only return live (not soft-deleted) rows. `commit_reservation`
/// and `commit_cancellation` must each apply all of their writes or none.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_event(&self, event: &Event) -> RepoResult<Event>;

    async fn get_event(&self, id: Uuid) -> RepoResult<Option<Event>>;

    async fn save_event(&self, event: &Event) -> RepoResult<()>;

    async fn create_booking(
        &self,
        event_id: Uuid,
        user_id: &str,
        status: BookingStatus,
    ) -> RepoResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> RepoResult<Option<Booking>>;

    /// Returns false when the booking was not live
    async fn soft_delete_booking(&self, id: Uuid) -> RepoResult<bool>;

    async fn list_bookings(&self, filter: &BookingFilter) -> RepoResult<Vec<BookingDetails>>;

    /// Insert a CONFIRMED booking and decrement the event's persisted
    /// `available_tickets` in one transaction. `None` if the event is gone.
    async fn commit_reservation(&self, event_id: Uuid, user_id: &str) -> RepoResult<Option<Booking>>;

    /// Cancel a live booking. With `promote_to`, the freed unit goes to a new
    /// CONFIRMED booking for that user; otherwise `available_tickets` is
    /// incremented. `None` if the booking is no longer live.
    async fn commit_cancellation(
        &self,
        booking_id: Uuid,
        promote_to: Option<&str>,
    ) -> RepoResult<Option<Cancellation>>;
}
