use std::sync::Arc;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use uuid::Uuid;
use boxoffice_shared::{Booking, BookingActivity, BookingDetails, BookingFilter, BookingStatus, Event};

use crate::inventory::{InventoryLedger, Reservation};
use crate::repository::BookingRepository;
use crate::waitlist::WaitingList;
use crate::{CoreError, CoreResult};

const ACTIVITY_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookingOutcome {
    Booked {
        booking: Booking,
    },
    /// A place in line, not a booking
    Waitlisted {
        event_id: Uuid,
        user_id: String,
        position: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    pub canceled: Booking,
    pub promoted: Option<Booking>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventOverview {
    #[serde(flatten)]
    pub event: Event,
    pub waitlist_size: usize,
}

/// Decides every booking and cancellation.
///
/// Owns the inventory ledger and the waiting lists; the repository is the
/// only durable state. Locks are taken inside the ledger and registry calls
/// and are never held across an `.await`.
pub struct BookingOrchestrator {
    repo: Arc<dyn BookingRepository>,
    inventory: InventoryLedger,
    waitlist: WaitingList,
    activity: broadcast::Sender<BookingActivity>,
}

impl BookingOrchestrator {
    pub fn new(repo: Arc<dyn BookingRepository>) -> Self {
        let (activity, _) = broadcast::channel(ACTIVITY_CHANNEL_CAPACITY);
        Self {
            repo,
            inventory: InventoryLedger::new(),
            waitlist: WaitingList::new(),
            activity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingActivity> {
        self.activity.subscribe()
    }

    pub fn inventory(&self) -> &InventoryLedger {
        &self.inventory
    }

    pub fn waitlist(&self) -> &WaitingList {
        &self.waitlist
    }

    fn publish(&self, activity: BookingActivity) {
        // No subscribers is fine
        let _ = self.activity.send(activity);
    }

    async fn load_event(&self, event_id: Uuid) -> CoreResult<Event> {
        let event = self
            .repo
            .get_event(event_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Event {}", event_id)))?;
        self.inventory.hydrate(&event);
        Ok(event)
    }

    fn give_back(&self, event_id: Uuid) {
        if let Err(e) = self.inventory.release(event_id) {
            warn!("Could not return reserved ticket for event {}: {}", event_id, e);
        }
    }

    pub async fn create_event(&self, total_tickets: i64) -> CoreResult<Event> {
        let total = i32::try_from(total_tickets)
            .ok()
            .filter(|t| *t >= 0)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!(
                    "total_tickets must be a non-negative integer, got {}",
                    total_tickets
                ))
            })?;

        let event = Event::new(total);
        self.inventory.create_inventory(event.id, total)?;

        match self.repo.create_event(&event).await {
            Ok(created) => {
                info!("Event created: {} with {} tickets", created.id, total);
                Ok(created)
            }
            Err(e) => {
                self.inventory.remove(event.id);
                error!("Failed to persist event {}: {}", event.id, e);
                Err(CoreError::StorageError(e.to_string()))
            }
        }
    }

    /// Event with live counters from the ledger
    pub async fn get_event(&self, event_id: Uuid) -> CoreResult<EventOverview> {
        let mut event = self.load_event(event_id).await?;
        let inventory = self.inventory.lookup(event_id)?;
        event.available_tickets = inventory.available_tickets;

        Ok(EventOverview {
            event,
            waitlist_size: self.waitlist.size(event_id),
        })
    }

    /// Soft delete. Waiting users for the event are dropped.
    pub async fn delete_event(&self, event_id: Uuid) -> CoreResult<()> {
        let mut event = self.load_event(event_id).await?;
        event.mark_deleted();
        self.repo.save_event(&event).await?;

        self.inventory.remove(event_id);
        let dropped = self.waitlist.drop_event(event_id);
        if dropped > 0 {
            warn!("Dropped {} waiting users of deleted event {}", dropped, event_id);
        }
        info!("Event deleted: {} ({} events tracked)", event_id, self.inventory.tracked_events());
        Ok(())
    }

    pub async fn waitlist_size(&self, event_id: Uuid) -> CoreResult<usize> {
        self.load_event(event_id).await?;
        Ok(self.waitlist.size(event_id))
    }

    pub async fn book_ticket(&self, event_id: Uuid, user_id: &str) -> CoreResult<BookingOutcome> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(CoreError::InvalidInput("user_id must not be empty".to_string()));
        }

        let event = self.load_event(event_id).await?;

        // Users already in line go first
        let reservation = if event.total_tickets == 0 || self.waitlist.size(event_id) > 0 {
            Reservation::Denied
        } else {
            self.inventory.try_reserve(event_id)?
        };

        match reservation {
            Reservation::Granted => {
                let booking = match self.repo.commit_reservation(event_id, user_id).await {
                    Ok(Some(booking)) => booking,
                    Ok(None) => {
                        self.give_back(event_id);
                        return Err(CoreError::NotFound(format!("Event {}", event_id)));
                    }
                    Err(e) => {
                        error!("Failed to persist booking for event {}: {}", event_id, e);
                        self.give_back(event_id);
                        self.settle_waitlist(event_id).await;
                        return Err(CoreError::StorageError(e.to_string()));
                    }
                };

                info!("Ticket booked: {} for user {} on event {}", booking.id, user_id, event_id);
                self.publish(BookingActivity::TicketBooked {
                    event_id,
                    booking_id: booking.id,
                    user_id: user_id.to_string(),
                    timestamp: chrono::Utc::now().timestamp(),
                });
                Ok(BookingOutcome::Booked { booking })
            }
            Reservation::Denied => {
                let position = self.waitlist.enqueue(event_id, user_id);
                info!("User {} waitlisted for event {} at position {}", user_id, event_id, position);
                self.publish(BookingActivity::Waitlisted {
                    event_id,
                    user_id: user_id.to_string(),
                    position,
                    timestamp: chrono::Utc::now().timestamp(),
                });

                // The sweep may have handed this caller an idle unit
                let promoted = self.settle_waitlist(event_id).await;
                if let Some(booking) = promoted.into_iter().find(|b| b.user_id == user_id) {
                    return Ok(BookingOutcome::Booked { booking });
                }

                Ok(BookingOutcome::Waitlisted {
                    event_id,
                    user_id: user_id.to_string(),
                    position,
                })
            }
        }
    }

    pub async fn cancel_booking(&self, booking_id: Uuid) -> CoreResult<CancellationOutcome> {
        let booking = self
            .repo
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking {}", booking_id)))?;
        let event_id = booking.event_id;

        let event = match self.repo.get_event(event_id).await? {
            Some(event) if booking.status == BookingStatus::Confirmed => event,
            _ => {
                // Event deleted or booking never held a unit: nothing to hand over
                if !self.repo.soft_delete_booking(booking_id).await? {
                    return Err(CoreError::NotFound(format!("Booking {}", booking_id)));
                }
                let mut canceled = booking;
                canceled.cancel();
                info!("Booking canceled without settlement: {}", booking_id);
                self.publish_canceled(&canceled);
                return Ok(CancellationOutcome { canceled, promoted: None });
            }
        };
        self.inventory.hydrate(&event);

        // Waiting users take priority over returning the unit to inventory
        let next_user = self.waitlist.dequeue_next(event_id);

        let cancellation = match self.repo.commit_cancellation(booking_id, next_user.as_deref()).await {
            Ok(Some(cancellation)) => cancellation,
            Ok(None) => {
                if let Some(user_id) = next_user {
                    self.waitlist.requeue_front(event_id, user_id);
                }
                return Err(CoreError::NotFound(format!("Booking {}", booking_id)));
            }
            Err(e) => {
                if let Some(user_id) = next_user {
                    warn!("Requeueing {} at the head of event {} after failed promotion", user_id, event_id);
                    self.waitlist.requeue_front(event_id, user_id);
                }
                error!("Failed to cancel booking {}: {}", booking_id, e);
                return Err(CoreError::StorageError(e.to_string()));
            }
        };

        info!("Booking canceled: {}", booking_id);
        self.publish_canceled(&cancellation.canceled);

        match &cancellation.promoted {
            Some(promoted) => {
                info!("Promoted user {} from waitlist of event {}: {}", promoted.user_id, event_id, promoted.id);
                self.publish_promoted(promoted);
            }
            None => {
                match self.inventory.release(event_id) {
                    Ok(available) => self.publish(BookingActivity::TicketReleased {
                        event_id,
                        available_tickets: available,
                        timestamp: chrono::Utc::now().timestamp(),
                    }),
                    Err(e) => warn!("Ledger release failed for event {}: {}", event_id, e),
                }
                self.settle_waitlist(event_id).await;
            }
        }

        Ok(CancellationOutcome {
            canceled: cancellation.canceled,
            promoted: cancellation.promoted,
        })
    }

    pub async fn list_bookings(&self, filter: &BookingFilter) -> CoreResult<Vec<BookingDetails>> {
        Ok(self.repo.list_bookings(filter).await?)
    }

    /// Hand idle units to waiting users.
    ///
    /// A request can be waitlisted while a concurrent cancellation finds the
    /// queue empty and releases its unit; this closes that window. Returns the
    /// bookings created, in queue order.
    async fn settle_waitlist(&self, event_id: Uuid) -> Vec<Booking> {
        let mut promoted = Vec::new();

        while self.waitlist.size(event_id) > 0 {
            if !matches!(self.inventory.try_reserve(event_id), Ok(Reservation::Granted)) {
                break;
            }
            let Some(user_id) = self.waitlist.dequeue_next(event_id) else {
                self.give_back(event_id);
                break;
            };

            match self.repo.commit_reservation(event_id, &user_id).await {
                Ok(Some(booking)) => {
                    info!("Promoted user {} into idle ticket of event {}: {}", user_id, event_id, booking.id);
                    self.publish_promoted(&booking);
                    promoted.push(booking);
                }
                Ok(None) => {
                    self.give_back(event_id);
                    break;
                }
                Err(e) => {
                    warn!("Promotion of {} for event {} failed, requeueing: {}", user_id, event_id, e);
                    self.waitlist.requeue_front(event_id, user_id);
                    self.give_back(event_id);
                    break;
                }
            }
        }

        promoted
    }

    fn publish_canceled(&self, booking: &Booking) {
        self.publish(BookingActivity::BookingCanceled {
            event_id: booking.event_id,
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    fn publish_promoted(&self, booking: &Booking) {
        self.publish(BookingActivity::WaitlistPromoted {
            event_id: booking.event_id,
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            timestamp: chrono::Utc::now().timestamp(),
        });
    }
}
