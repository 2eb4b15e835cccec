use crate::models::{Offer, OfferStatus};
use chrono::Utc;
use ryde_booking::expiry::ExpiryTimers;
use ryde_booking::ledger::{LedgerError, SeatLedger};
use ryde_catalog::listing::Ride;
use ryde_core::store::{EntityKind, EntityStore, StoreError};
use ryde_shared::models::events::{DomainEvent, OfferDecidedEvent};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OfferError {
    #[error("Offer not found")]
    NotFound,

    #[error("Offer has expired")]
    Expired,

    #[error("Offer already finalized")]
    AlreadyFinalized,

    #[error("Only the ride host can respond to this offer")]
    NotHost,

    #[error("Only the proposer can withdraw this offer")]
    NotProposer,

    #[error("Ride is fully booked")]
    SeatUnavailable,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("External store failure: {0}")]
    Store(#[from] StoreError),
}

/// Counter-offer lifecycle engine. Offers share the Seat Ledger with
/// reservations, so a seat-locked offer and a hold can never double-allocate
/// the same seat. Terminal transitions use the same lock-then-swap discipline
/// as the Reservation Manager: the deadline task and a host or proposer
/// action race, exactly one wins, and a locked seat is released exactly once
/// on any terminal path except Accepted.
pub struct NegotiationEngine {
    ledger: Arc<SeatLedger>,
    store: Arc<dyn EntityStore>,
    offers: Mutex<HashMap<Uuid, Offer>>,
    timers: ExpiryTimers,
    offer_ttl: Duration,
    events: broadcast::Sender<DomainEvent>,
    /// Self-handle for the deadline tasks spawned off propose().
    this: Weak<NegotiationEngine>,
}

impl NegotiationEngine {
    pub fn new(
        ledger: Arc<SeatLedger>,
        store: Arc<dyn EntityStore>,
        offer_ttl: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(128);
        Arc::new_cyclic(|this| Self {
            ledger,
            store,
            offers: Mutex::new(HashMap::new()),
            timers: ExpiryTimers::new(),
            offer_ttl,
            events,
            this: this.clone(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Open a counter-offer. With `seat_locked`, one seat is taken through
    /// the ledger for the lifetime of the negotiation.
    pub async fn propose(
        &self,
        ride: &Ride,
        proposer_id: Uuid,
        offered_amount_cents: i64,
        seat_locked: bool,
    ) -> Result<Offer, OfferError> {
        if seat_locked && !self.ledger.try_reserve(ride.id, 1).await? {
            return Err(OfferError::SeatUnavailable);
        }

        let offer = Offer::new(
            ride.id,
            proposer_id,
            ride.base_price_cents,
            offered_amount_cents,
            self.offer_ttl,
            seat_locked,
        );
        let fields = serde_json::to_value(&offer)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Err(e) = self.store.create(EntityKind::Offer, fields).await {
            if seat_locked {
                if let Err(le) = self.ledger.release(ride.id, 1).await {
                    error!("Compensating release failed for ride {}: {}", ride.id, le);
                }
            }
            return Err(OfferError::Store(e));
        }
        if seat_locked {
            self.mirror_ride_seats(ride.id).await;
        }

        let offer_id = offer.id;
        {
            let mut offers = self.offers.lock().await;
            offers.insert(offer_id, offer.clone());
        }

        if let Some(engine) = self.this.upgrade() {
            let deadline = Instant::now() + self.offer_ttl;
            self.timers
                .schedule(offer_id, deadline, async move {
                    engine.expire(offer_id).await;
                })
                .await;
        }

        info!(
            "Offer {} opened on ride {} at {} against {}",
            offer_id, ride.id, offered_amount_cents, ride.base_price_cents
        );
        Ok(offer)
    }

    /// Host accepts a pending offer before its deadline. The locked seat
    /// stays allocated; it now belongs to the agreed booking.
    pub async fn accept(&self, offer_id: Uuid, host_id: Uuid) -> Result<Offer, OfferError> {
        self.ensure_host(offer_id, host_id).await?;

        let (offer, lapsed) = {
            let mut offers = self.offers.lock().await;
            let offer = offers.get_mut(&offer_id).ok_or(OfferError::NotFound)?;
            match offer.status {
                OfferStatus::Pending if offer.is_lapsed() => {
                    offer.status = OfferStatus::Expired;
                    (offer.clone(), true)
                }
                OfferStatus::Pending => {
                    offer.status = OfferStatus::Accepted;
                    offer.responded_at = Some(Utc::now());
                    (offer.clone(), false)
                }
                OfferStatus::Expired => return Err(OfferError::Expired),
                _ => return Err(OfferError::AlreadyFinalized),
            }
        };

        self.timers.cancel(offer_id).await;
        if lapsed {
            self.settle_terminal(&offer, true).await;
            return Err(OfferError::Expired);
        }

        self.settle_terminal(&offer, false).await;
        Ok(offer)
    }

    /// Host declines, optionally with a message to the proposer.
    pub async fn reject(
        &self,
        offer_id: Uuid,
        host_id: Uuid,
        driver_response: Option<String>,
    ) -> Result<(), OfferError> {
        self.ensure_host(offer_id, host_id).await?;

        let offer = {
            let mut offers = self.offers.lock().await;
            let offer = offers.get_mut(&offer_id).ok_or(OfferError::NotFound)?;
            if offer.status.is_terminal() {
                return Err(OfferError::AlreadyFinalized);
            }
            offer.status = OfferStatus::Rejected;
            offer.driver_response = driver_response;
            offer.responded_at = Some(Utc::now());
            offer.clone()
        };

        self.timers.cancel(offer_id).await;
        self.settle_terminal(&offer, true).await;
        Ok(())
    }

    /// Proposer pulls their own pending offer.
    pub async fn withdraw(&self, offer_id: Uuid, proposer_id: Uuid) -> Result<(), OfferError> {
        let offer = {
            let mut offers = self.offers.lock().await;
            let offer = offers.get_mut(&offer_id).ok_or(OfferError::NotFound)?;
            if offer.proposer_id != proposer_id {
                return Err(OfferError::NotProposer);
            }
            if offer.status.is_terminal() {
                return Err(OfferError::AlreadyFinalized);
            }
            offer.status = OfferStatus::Withdrawn;
            offer.clone()
        };

        self.timers.cancel(offer_id).await;
        self.settle_terminal(&offer, true).await;
        Ok(())
    }

    /// Deadline action. No-op unless the offer is still Pending.
    pub async fn expire(&self, offer_id: Uuid) {
        let offer = {
            let mut offers = self.offers.lock().await;
            match offers.get_mut(&offer_id) {
                Some(o) if o.status == OfferStatus::Pending => {
                    o.status = OfferStatus::Expired;
                    o.clone()
                }
                _ => return,
            }
        };
        self.timers.discard(offer_id).await;
        self.settle_terminal(&offer, true).await;
    }

    /// Cascade for a cancelled ride: every pending offer expires and any
    /// locked seats come back. Returns how many offers were swept.
    pub async fn cascade_ride_cancelled(&self, ride_id: Uuid) -> usize {
        let pending: Vec<Uuid> = {
            let offers = self.offers.lock().await;
            offers
                .values()
                .filter(|o| o.ride_id == ride_id && o.status == OfferStatus::Pending)
                .map(|o| o.id)
                .collect()
        };

        for offer_id in &pending {
            self.timers.cancel(*offer_id).await;
            self.expire(*offer_id).await;
        }
        info!(
            "Swept {} pending offers off cancelled ride {}",
            pending.len(),
            ride_id
        );
        pending.len()
    }

    pub async fn get_offer(&self, offer_id: Uuid) -> Option<Offer> {
        self.offers.lock().await.get(&offer_id).cloned()
    }

    async fn ensure_host(&self, offer_id: Uuid, host_id: Uuid) -> Result<(), OfferError> {
        let ride_id = {
            let offers = self.offers.lock().await;
            offers
                .get(&offer_id)
                .map(|o| o.ride_id)
                .ok_or(OfferError::NotFound)?
        };
        let record = self.store.get(EntityKind::Ride, ride_id).await?;
        let host = record
            .fields
            .get("host_driver_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok());
        if host != Some(host_id) {
            return Err(OfferError::NotHost);
        }
        Ok(())
    }

    /// Store mirror, seat release and event fan-out for an offer that just
    /// reached a terminal state. `release_seat` is false only for Accepted.
    async fn settle_terminal(&self, offer: &Offer, release_seat: bool) {
        if release_seat && offer.seat_locked {
            if let Err(e) = self.ledger.release(offer.ride_id, 1).await {
                error!("Seat release failed for offer {}: {}", offer.id, e);
            }
            self.mirror_ride_seats(offer.ride_id).await;
        }

        let patch = serde_json::json!({
            "status": offer.status,
            "driver_response": offer.driver_response,
            "responded_at": offer.responded_at,
        });
        if let Err(e) = self.store.update(EntityKind::Offer, offer.id, patch).await {
            warn!("Failed to mirror status for offer {}: {}", offer.id, e);
        }

        let status = match offer.status {
            OfferStatus::Pending => "PENDING",
            OfferStatus::Accepted => "ACCEPTED",
            OfferStatus::Rejected => "REJECTED",
            OfferStatus::Expired => "EXPIRED",
            OfferStatus::Withdrawn => "WITHDRAWN",
        };
        info!("Offer {} settled as {}", offer.id, status);
        let _ = self.events.send(DomainEvent::OfferDecided(OfferDecidedEvent {
            offer_id: offer.id,
            ride_id: offer.ride_id,
            proposer_id: offer.proposer_id,
            status: status.to_string(),
            timestamp: Utc::now().timestamp(),
        }));
    }

    async fn mirror_ride_seats(&self, ride_id: Uuid) {
        match self.ledger.available(ride_id).await {
            Ok(available) => {
                let patch = serde_json::json!({ "seats_available": available });
                if let Err(e) = self.store.update(EntityKind::Ride, ride_id, patch).await {
                    warn!("Failed to mirror seat count for ride {}: {}", ride_id, e);
                }
            }
            Err(e) => warn!("Ledger read failed for ride {}: {}", ride_id, e),
        }
    }
}
