use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use uuid::Uuid;

type Queue = Arc<Mutex<VecDeque<String>>>;

/// Per-event FIFO queues of users waiting for a ticket.
///
/// Entries live in memory only. Each event has its own lock, so queues for
/// different events never contend beyond the brief map lookup.
pub struct WaitingList {
    queues: RwLock<HashMap<Uuid, Queue>>,
}

impl WaitingList {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
        }
    }

    fn queue(&self, event_id: Uuid) -> Option<Queue> {
        self.queues.read().get(&event_id).cloned()
    }

    fn queue_or_create(&self, event_id: Uuid) -> Queue {
        if let Some(queue) = self.queue(event_id) {
            return queue;
        }
        self.queues.write().entry(event_id).or_default().clone()
    }

    /// Append to the tail, returning the 1-based position
    pub fn enqueue(&self, event_id: Uuid, user_id: &str) -> usize {
        let queue = self.queue_or_create(event_id);
        let mut queue = queue.lock();
        queue.push_back(user_id.to_string());
        queue.len()
    }

    pub fn dequeue_next(&self, event_id: Uuid) -> Option<String> {
        self.queue(event_id)?.lock().pop_front()
    }

    /// Put a popped user back at the head (failed promotion)
    pub fn requeue_front(&self, event_id: Uuid, user_id: String) {
        self.queue_or_create(event_id).lock().push_front(user_id);
    }

    pub fn size(&self, event_id: Uuid) -> usize {
        match self.queue(event_id) {
            Some(queue) => {
                let len = queue.lock().len();
                len
            }
            None => 0,
        }
    }

    /// Discard an event's queue, returning how many users were dropped
    pub fn drop_event(&self, event_id: Uuid) -> usize {
        self.queues
            .write()
            .remove(&event_id)
            .map(|queue| {
                let len = queue.lock().len();
                len
            })
            .unwrap_or(0)
    }
}

impl Default for WaitingList {
    fn default() -> Self {
        Self::new()
    }
}
