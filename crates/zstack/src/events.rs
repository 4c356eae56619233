//! Events reported to the driver's user.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};
use zstack_protocol::{ApplicationMessage, IeeeAddress, NetworkAddress};

use crate::error::{Result, ZStackError};
use crate::node_table::Node;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZStackEvent {
    /// A node joined the network for the first time.
    NodeJoin(Node),
    /// A known node announced itself again, possibly with a new address.
    NodeUpdate(Node),
    /// A node left or was removed.
    NodeLeave(Node),
    /// Application data arrived from a known node.
    ApplicationMessage {
        source_ieee: IeeeAddress,
        source_network: NetworkAddress,
        message: ApplicationMessage,
    },
}

/// Bounded event queue shared by the driver's producers.
///
/// Producers never wait: once `capacity` events are unread, the oldest one
/// is discarded to make room.
#[derive(Debug)]
pub(crate) struct EventQueue {
    capacity: usize,
    events: Mutex<VecDeque<ZStackEvent>>,
    available: Notify,
}

impl EventQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        EventQueue {
            capacity,
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            available: Notify::new(),
        }
    }

    /// Queue an event, discarding the oldest unread one when full.
    pub(crate) fn emit(&self, event: ZStackEvent) {
        debug!(?event, "emitting event");
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            if let Some(dropped) = events.pop_front() {
                warn!(?dropped, capacity = self.capacity, "event queue full, dropping oldest event");
            }
        }
        events.push_back(event);
        drop(events);
        self.available.notify_one();
    }

    pub(crate) async fn next(&self, deadline: Instant) -> Result<ZStackEvent> {
        loop {
            let event = self.events.lock().pop_front();
            if let Some(event) = event {
                return Ok(event);
            }
            // A notification sent since the check above is kept as a permit.
            timeout_at(deadline, self.available.notified())
                .await
                .map_err(|_| ZStackError::DeadlineExceeded("waiting for an event"))?;
        }
    }
}
