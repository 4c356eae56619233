//! Pool of AF transaction sequence numbers.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use tokio::time::{timeout_at, Instant};

use crate::error::{Result, ZStackError};

/// Reusable 8-bit transaction ids. An id is held by at most one request.
#[derive(Debug)]
pub struct TransactionIdPool {
    available: Semaphore,
    ids: Mutex<VecDeque<u8>>,
}

impl TransactionIdPool {
    /// Create a pool of `size` ids, `0..size`. Sizes above 256 are clamped.
    pub fn new(size: usize) -> Arc<Self> {
        let size = size.min(256);
        let ids: VecDeque<u8> = (0..size).map(|id| id as u8).collect();
        Arc::new(TransactionIdPool {
            available: Semaphore::new(ids.len()),
            ids: Mutex::new(ids),
        })
    }

    /// Check out an id, waiting until one is free or the deadline passes.
    pub async fn acquire(self: &Arc<Self>, deadline: Instant) -> Result<TransactionId> {
        let permit = timeout_at(deadline, self.available.acquire())
            .await
            .map_err(|_| ZStackError::DeadlineExceeded("waiting for a transaction id"))?
            .map_err(|_| ZStackError::TransportClosed)?;

        let id = self.ids.lock().pop_front();
        match id {
            Some(id) => {
                // The guard returns both the id and the permit.
                permit.forget();
                Ok(TransactionId {
                    id,
                    pool: Arc::clone(self),
                })
            }
            None => Err(ZStackError::DeadlineExceeded("waiting for a transaction id")),
        }
    }

    /// Number of ids not checked out.
    pub fn available(&self) -> usize {
        self.ids.lock().len()
    }

    /// Snapshot of the free ids, sorted.
    pub fn free_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.ids.lock().iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn release(&self, id: u8) {
        self.ids.lock().push_back(id);
        self.available.add_permits(1);
    }
}

/// A checked-out transaction id, returned to the pool on drop.
#[derive(Debug)]
pub struct TransactionId {
    id: u8,
    pool: Arc<TransactionIdPool>,
}

impl TransactionId {
    pub fn value(&self) -> u8 {
        self.id
    }
}

impl Drop for TransactionId {
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}
