use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;
use boxoffice_shared::Event;

/// Ticket counters for one event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inventory {
    pub total_tickets: i32,
    pub available_tickets: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    Granted,
    Denied,
}

/// Authoritative in-memory counters, one lock per event.
///
/// `try_reserve` and `release` run entirely under the event's mutex, so two
/// callers racing for the last ticket get exactly one `Granted`.
pub struct InventoryLedger {
    inventory: RwLock<HashMap<Uuid, Arc<Mutex<Inventory>>>>,
    // Removed events are never hydrated again
    retired: RwLock<HashSet<Uuid>>,
}

impl InventoryLedger {
    pub fn new() -> Self {
        Self {
            inventory: RwLock::new(HashMap::new()),
            retired: RwLock::new(HashSet::new()),
        }
    }

    fn slot(&self, event_id: Uuid) -> Result<Arc<Mutex<Inventory>>, InventoryError> {
        self.inventory
            .read()
            .get(&event_id)
            .cloned()
            .ok_or(InventoryError::NotFound(event_id))
    }

    /// Initialize counters for a new event
    pub fn create_inventory(&self, event_id: Uuid, total_tickets: i32) -> Result<(), InventoryError> {
        if total_tickets < 0 {
            return Err(InventoryError::InvalidCapacity(total_tickets));
        }

        self.inventory.write().insert(
            event_id,
            Arc::new(Mutex::new(Inventory {
                total_tickets,
                available_tickets: total_tickets,
            })),
        );
        Ok(())
    }

    /// Seed counters from a persisted event unless already tracked.
    ///
    /// Deleted or removed events are skipped, so a stale read racing a
    /// delete can't bring the counters back.
    pub fn hydrate(&self, event: &Event) {
        if event.is_deleted() || self.inventory.read().contains_key(&event.id) {
            return;
        }

        let available = event.available_tickets.clamp(0, event.total_tickets.max(0));
        // Check under the write lock so this can't interleave with `remove`
        let mut inventory = self.inventory.write();
        if self.retired.read().contains(&event.id) {
            return;
        }
        inventory.entry(event.id).or_insert_with(|| {
            Arc::new(Mutex::new(Inventory {
                total_tickets: event.total_tickets,
                available_tickets: available,
            }))
        });
    }

    pub fn try_reserve(&self, event_id: Uuid) -> Result<Reservation, InventoryError> {
        let slot = self.slot(event_id)?;
        let mut item = slot.lock();

        if item.available_tickets > 0 {
            item.available_tickets -= 1;
            Ok(Reservation::Granted)
        } else {
            Ok(Reservation::Denied)
        }
    }

    /// Return one unit, returning the new available count
    pub fn release(&self, event_id: Uuid) -> Result<i32, InventoryError> {
        let slot = self.slot(event_id)?;
        let mut item = slot.lock();

        if item.available_tickets >= item.total_tickets {
            return Err(InventoryError::OverRelease {
                event_id,
                total: item.total_tickets,
            });
        }

        item.available_tickets += 1;
        Ok(item.available_tickets)
    }

    pub fn lookup(&self, event_id: Uuid) -> Result<Inventory, InventoryError> {
        Ok(*self.slot(event_id)?.lock())
    }

    /// Stop tracking an event for good
    pub fn remove(&self, event_id: Uuid) -> Option<Inventory> {
        let mut inventory = self.inventory.write();
        self.retired.write().insert(event_id);
        inventory.remove(&event_id).map(|slot| {
            let counters = *slot.lock();
            counters
        })
    }

    /// Number of events with live counters
    pub fn tracked_events(&self) -> usize {
        self.inventory.read().len()
    }
}

impl Default for InventoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error("Ticket count must be non-negative, got {0}")]
    InvalidCapacity(i32),

    #[error("Inventory not found: {0}")]
    NotFound(Uuid),

    #[error("Release would exceed capacity of {total} for event {event_id}")]
    OverRelease {
        event_id: Uuid,
        total: i32,
    },
}
