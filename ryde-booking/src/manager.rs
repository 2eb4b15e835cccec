use crate::expiry::ExpiryTimers;
use crate::ledger::{LedgerError, SeatLedger};
use crate::models::{Booking, Reservation, ReservationStatus};
use chrono::{DateTime, Utc};
use ryde_catalog::eligibility::{check_eligibility, EligibilityError};
use ryde_catalog::listing::Ride;
use ryde_core::store::{EntityKind, EntityStore, StoreError};
use ryde_shared::models::events::{
    BookingConfirmedEvent, DomainEvent, ReservationCancelledEvent, ReservationExpiredEvent,
    SeatReservedEvent,
};
use ryde_shared::UserProfile;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// What the client gets back from a successful reserve: the hold token to
/// confirm with, and the deadline to beat.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HoldGrant {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    /// Set for FemalePreferred listings booked by male riders; the host has
    /// to approve before the ride.
    pub approval_required: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ReserveError {
    #[error(transparent)]
    Ineligible(#[from] EligibilityError),

    #[error("Ride is fully booked")]
    SeatUnavailable,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("External store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("Reservation not found")]
    NotFound,

    #[error("Reservation expired, please try again")]
    Expired,

    #[error("Reservation already finalized")]
    AlreadyFinalized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("External store failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, thiserror::Error)]
pub enum CancelError {
    #[error("Reservation not found")]
    NotFound,

    #[error("Reservation already finalized")]
    AlreadyFinalized,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Creates, tracks and expires seat holds. The in-process reservation map is
/// authoritative; the external store copy is mirrored best-effort and
/// reconciled on drift. All status transitions go through the map's lock,
/// which gives confirm, cancel and the expiry task compare-and-swap
/// semantics: exactly one of them wins, the others become no-ops.
pub struct ReservationManager {
    ledger: Arc<SeatLedger>,
    store: Arc<dyn EntityStore>,
    reservations: Mutex<HashMap<Uuid, Reservation>>,
    timers: ExpiryTimers,
    hold_window: Duration,
    /// Flat platform fee added on top of the ride fare at confirm time,
    /// from `BusinessRules::booking_fee_cents`.
    booking_fee_cents: i64,
    events: broadcast::Sender<DomainEvent>,
    /// Self-handle for the expiry tasks spawned off reserve().
    this: Weak<ReservationManager>,
}

impl ReservationManager {
    pub fn new(
        ledger: Arc<SeatLedger>,
        store: Arc<dyn EntityStore>,
        hold_window: Duration,
        booking_fee_cents: i64,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(128);
        Arc::new_cyclic(|this| Self {
            ledger,
            store,
            reservations: Mutex::new(HashMap::new()),
            timers: ExpiryTimers::new(),
            hold_window,
            booking_fee_cents,
            events,
            this: this.clone(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }

    /// Register a ride's seat counters with the ledger.
    pub fn track_ride(&self, ride: &Ride) {
        self.ledger
            .register(ride.id, ride.seat_capacity, ride.seats_available);
    }

    pub fn ledger(&self) -> &Arc<SeatLedger> {
        &self.ledger
    }

    /// Open a 90-second hold on one seat. Eligibility and availability are
    /// decided before any mutation; if the store write fails after the seat
    /// was granted, the seat is released again so nothing leaks.
    pub async fn reserve(
        &self,
        ride: &Ride,
        user: &UserProfile,
    ) -> Result<HoldGrant, ReserveError> {
        let admission = check_eligibility(ride, user)?;

        if !self.ledger.try_reserve(ride.id, 1).await? {
            return Err(ReserveError::SeatUnavailable);
        }

        let reservation = Reservation::new(ride.id, user.id, self.hold_window);
        let fields = serde_json::to_value(&reservation)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Err(e) = self.store.create(EntityKind::Reservation, fields).await {
            // Compensating release: the decrement must not outlive a failed
            // record write.
            if let Err(le) = self.ledger.release(ride.id, 1).await {
                error!("Compensating release failed for ride {}: {}", ride.id, le);
            }
            return Err(ReserveError::Store(e));
        }
        self.mirror_ride_seats(ride.id).await;

        let token = reservation.reservation_token;
        let expires_at = reservation.expires_at;
        {
            let mut map = self.reservations.lock().await;
            map.insert(token, reservation);
        }

        if let Some(mgr) = self.this.upgrade() {
            let deadline = Instant::now() + self.hold_window;
            self.timers
                .schedule(token, deadline, async move {
                    mgr.expire(token).await;
                })
                .await;
        }

        info!("Seat held on ride {} until {}", ride.id, expires_at);
        let _ = self.events.send(DomainEvent::SeatReserved(SeatReservedEvent {
            ride_id: ride.id,
            user_id: user.id,
            reservation_token: token,
            expires_at: expires_at.timestamp(),
        }));

        Ok(HoldGrant {
            token,
            expires_at,
            approval_required: admission.approval_required,
        })
    }

    /// Finalize a hold into a booking. Idempotent-safe: a token that already
    /// expired, confirmed or cancelled fails cleanly without touching the
    /// ledger again.
    pub async fn confirm(&self, token: Uuid) -> Result<Booking, ConfirmError> {
        let reservation = {
            let mut map = self.reservations.lock().await;
            let reservation = map.get_mut(&token).ok_or(ConfirmError::NotFound)?;
            match reservation.status {
                ReservationStatus::Pending if reservation.is_lapsed() => {
                    // The deadline passed but the timer has not fired yet;
                    // this call loses the race on the client's behalf.
                    reservation.status = ReservationStatus::Expired;
                    let lapsed = reservation.clone();
                    drop(map);
                    self.timers.cancel(token).await;
                    self.settle_expired(&lapsed).await;
                    return Err(ConfirmError::Expired);
                }
                ReservationStatus::Pending => {
                    reservation.status = ReservationStatus::Confirmed;
                    reservation.clone()
                }
                ReservationStatus::Expired => return Err(ConfirmError::Expired),
                ReservationStatus::Confirmed | ReservationStatus::Cancelled => {
                    return Err(ConfirmError::AlreadyFinalized)
                }
            }
        };

        self.timers.cancel(token).await;

        let fare = match self.ride_fare(reservation.ride_id).await {
            Ok(base) => base + self.booking_fee_cents,
            Err(e) => {
                // A booking must carry the real fare; a ride we cannot read
                // backs the confirm out like a failed write would.
                self.rollback_confirm(token).await;
                return Err(ConfirmError::Store(e));
            }
        };
        let booking = Booking::from_reservation(&reservation, fare);
        let fields = serde_json::to_value(&booking)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        if let Err(e) = self.store.create(EntityKind::Booking, fields).await {
            // No partial state: back out of the confirm and give the seat up.
            self.rollback_confirm(token).await;
            return Err(ConfirmError::Store(e));
        }

        self.mirror_reservation(&reservation).await;
        info!(
            "Reservation {} confirmed into booking {}",
            reservation.id, booking.id
        );
        let _ = self
            .events
            .send(DomainEvent::BookingConfirmed(BookingConfirmedEvent {
                booking_id: booking.id,
                ride_id: booking.ride_id,
                user_id: booking.user_id,
                fare_amount_cents: booking.fare_amount_cents,
                timestamp: Utc::now().timestamp(),
            }));

        Ok(booking)
    }

    /// Abort a pending hold and give the seat back.
    pub async fn cancel(&self, token: Uuid) -> Result<(), CancelError> {
        let reservation = {
            let mut map = self.reservations.lock().await;
            let reservation = map.get_mut(&token).ok_or(CancelError::NotFound)?;
            if reservation.status.is_terminal() {
                return Err(CancelError::AlreadyFinalized);
            }
            reservation.status = ReservationStatus::Cancelled;
            reservation.clone()
        };

        self.timers.cancel(token).await;
        self.ledger
            .release(reservation.ride_id, reservation.seats_reserved)
            .await?;
        self.mirror_ride_seats(reservation.ride_id).await;
        self.mirror_reservation(&reservation).await;

        info!("Reservation {} cancelled by holder", reservation.id);
        let _ = self
            .events
            .send(DomainEvent::ReservationCancelled(ReservationCancelledEvent {
                ride_id: reservation.ride_id,
                reservation_token: token,
                timestamp: Utc::now().timestamp(),
            }));
        Ok(())
    }

    /// Deadline action for a hold. A no-op unless the reservation is still
    /// Pending, so a confirm or cancel that won the race is respected.
    pub async fn expire(&self, token: Uuid) {
        let reservation = {
            let mut map = self.reservations.lock().await;
            match map.get_mut(&token) {
                Some(r) if r.status == ReservationStatus::Pending => {
                    r.status = ReservationStatus::Expired;
                    r.clone()
                }
                _ => return,
            }
        };
        self.timers.discard(token).await;
        self.settle_expired(&reservation).await;
    }

    /// Cascade for a cancelled ride: every pending hold is cancelled and its
    /// seat returned. Returns how many holds were swept.
    pub async fn cancel_ride(&self, ride_id: Uuid) -> usize {
        let tokens: Vec<Uuid> = {
            let map = self.reservations.lock().await;
            map.values()
                .filter(|r| r.ride_id == ride_id && r.status == ReservationStatus::Pending)
                .map(|r| r.reservation_token)
                .collect()
        };

        let mut swept = 0;
        for token in tokens {
            if self.cancel(token).await.is_ok() {
                swept += 1;
            }
        }
        info!("Swept {} pending holds off cancelled ride {}", swept, ride_id);
        swept
    }

    pub async fn get_reservation(&self, token: Uuid) -> Option<Reservation> {
        self.reservations.lock().await.get(&token).cloned()
    }

    /// Release and bookkeeping for a reservation already swapped to Expired.
    async fn settle_expired(&self, reservation: &Reservation) {
        if let Err(e) = self
            .ledger
            .release(reservation.ride_id, reservation.seats_reserved)
            .await
        {
            error!(
                "Seat release failed for expired reservation {}: {}",
                reservation.id, e
            );
        }
        self.mirror_ride_seats(reservation.ride_id).await;
        self.mirror_reservation(reservation).await;

        info!("Reservation {} expired, seat released", reservation.id);
        let _ = self
            .events
            .send(DomainEvent::ReservationExpired(ReservationExpiredEvent {
                ride_id: reservation.ride_id,
                reservation_token: reservation.reservation_token,
                timestamp: Utc::now().timestamp(),
            }));
    }

    /// Back out of a confirm whose booking write failed: Confirmed →
    /// Cancelled plus one seat release.
    async fn rollback_confirm(&self, token: Uuid) {
        let reservation = {
            let mut map = self.reservations.lock().await;
            match map.get_mut(&token) {
                Some(r) if r.status == ReservationStatus::Confirmed => {
                    r.status = ReservationStatus::Cancelled;
                    r.clone()
                }
                _ => return,
            }
        };
        if let Err(e) = self
            .ledger
            .release(reservation.ride_id, reservation.seats_reserved)
            .await
        {
            error!(
                "Compensating release failed for reservation {}: {}",
                reservation.id, e
            );
        }
        self.mirror_ride_seats(reservation.ride_id).await;
        self.mirror_reservation(&reservation).await;
        warn!(
            "Reservation {} rolled back after booking write failure",
            reservation.id
        );
    }

    /// Fare for a ride, read back from the store record.
    async fn ride_fare(&self, ride_id: Uuid) -> Result<i64, StoreError> {
        let record = self.store.get(EntityKind::Ride, ride_id).await?;
        let ride: Ride = record.decode()?;
        Ok(ride.base_price_cents)
    }

    /// Mirror the authoritative in-process availability onto the store's
    /// ride record. Best effort; drift is reconciled on the next register.
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

    async fn mirror_reservation(&self, reservation: &Reservation) {
        let patch = serde_json::json!({ "status": reservation.status });
        if let Err(e) = self
            .store
            .update(EntityKind::Reservation, reservation.id, patch)
            .await
        {
            warn!(
                "Failed to mirror status for reservation {}: {}",
                reservation.id, e
            );
        }
    }
}
