pub mod models;

pub use models::activity::BookingActivity;
pub use models::booking::{Booking, BookingDetails, BookingFilter, BookingStatus, EventSummary};
pub use models::event::Event;
