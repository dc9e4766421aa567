pub mod repository;
pub mod waitlist;
pub mod inventory;
pub mod orchestrator;
pub mod memory;

pub use inventory::{Inventory, InventoryLedger, Reservation};
pub use memory::InMemoryBookingRepository;
pub use orchestrator::{BookingOrchestrator, BookingOutcome, CancellationOutcome, EventOverview};
pub use repository::{BookingRepository, Cancellation, RepoResult};
pub use waitlist::WaitingList;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Storage failure: {0}")]
    StorageError(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::StorageError(err.to_string())
    }
}

impl From<inventory::InventoryError> for CoreError {
    fn from(err: inventory::InventoryError) -> Self {
        match err {
            inventory::InventoryError::InvalidCapacity(_) => CoreError::InvalidInput(err.to_string()),
            inventory::InventoryError::NotFound(_) => CoreError::NotFound(err.to_string()),
            inventory::InventoryError::OverRelease { .. } => CoreError::Conflict(err.to_string()),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
