//! The single authoritative counter and serialization point for seat
//! availability. Every seat mutation in the system passes through here.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug)]
struct SeatState {
    capacity: i32,
    available: i32,
}

/// Per-listing seat accounting. Each listing gets its own lock, so operations
/// on different listings never contend; operations on the same listing are
/// serialized, which is what guarantees at-most-one grant per unit of
/// availability.
pub struct SeatLedger {
    listings: RwLock<HashMap<Uuid, Arc<Mutex<SeatState>>>>,
}

impl SeatLedger {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
        }
    }

    /// Start tracking a listing. Replaces any previous entry, so it also
    /// serves reconciliation against the external store's copy.
    pub fn register(&self, listing_id: Uuid, capacity: i32, available: i32) {
        let state = Arc::new(Mutex::new(SeatState {
            capacity,
            available: available.clamp(0, capacity),
        }));
        if let Ok(mut map) = self.listings.write() {
            map.insert(listing_id, state);
        }
    }

    fn slot(&self, listing_id: &Uuid) -> Result<Arc<Mutex<SeatState>>, LedgerError> {
        let map = self
            .listings
            .read()
            .map_err(|_| LedgerError::UnknownListing(*listing_id))?;
        map.get(listing_id)
            .cloned()
            .ok_or(LedgerError::UnknownListing(*listing_id))
    }

    /// Atomically grant `count` seats if available. Returns false without
    /// side effect when the listing cannot cover the request.
    pub async fn try_reserve(&self, listing_id: Uuid, count: i32) -> Result<bool, LedgerError> {
        let slot = self.slot(&listing_id)?;
        let mut state = slot.lock().await;
        if state.available >= count && count > 0 {
            state.available -= count;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Return `count` seats to the pool, clamped at capacity to guard against
    /// double-release bugs. Returns the new availability.
    pub async fn release(&self, listing_id: Uuid, count: i32) -> Result<i32, LedgerError> {
        let slot = self.slot(&listing_id)?;
        let mut state = slot.lock().await;
        state.available = (state.available + count.max(0)).min(state.capacity);
        Ok(state.available)
    }

    pub async fn available(&self, listing_id: Uuid) -> Result<i32, LedgerError> {
        let slot = self.slot(&listing_id)?;
        let state = slot.lock().await;
        Ok(state.available)
    }
}

impl Default for SeatLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Seat ledger has no entry for listing {0}")]
    UnknownListing(Uuid),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reserve_and_release() {
        let ledger = SeatLedger::new();
        let id = Uuid::new_v4();
        ledger.register(id, 3, 3);

        assert!(ledger.try_reserve(id, 2).await.unwrap());
        assert_eq!(ledger.available(id).await.unwrap(), 1);

        // Denied without side effect.
        assert!(!ledger.try_reserve(id, 2).await.unwrap());
        assert_eq!(ledger.available(id).await.unwrap(), 1);

        assert_eq!(ledger.release(id, 2).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_release_clamped_at_capacity() {
        let ledger = SeatLedger::new();
        let id = Uuid::new_v4();
        ledger.register(id, 2, 2);

        // Double release must not push availability past capacity.
        assert_eq!(ledger.release(id, 5).await.unwrap(), 2);
        assert_eq!(ledger.available(id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unknown_listing() {
        let ledger = SeatLedger::new();
        assert!(matches!(
            ledger.try_reserve(Uuid::new_v4(), 1).await,
            Err(LedgerError::UnknownListing(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_overbooking_under_contention() {
        let ledger = Arc::new(SeatLedger::new());
        let id = Uuid::new_v4();
        ledger.register(id, 3, 3);

        let mut handles = Vec::new();
        for _ in 0..16 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(
                async move { ledger.try_reserve(id, 1).await },
            ));
        }

        let mut granted = 0;
        for h in handles {
            if h.await.unwrap().unwrap() {
                granted += 1;
            }
        }
        assert_eq!(granted, 3);
        assert_eq!(ledger.available(id).await.unwrap(), 0);
    }
}
