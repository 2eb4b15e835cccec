use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reservation lifecycle. Confirmed, Expired and Cancelled are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        *self != ReservationStatus::Pending
    }
}

/// A time-bounded exclusive claim on one seat, pending payment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub seats_reserved: i32,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
    /// Opaque 128-bit random hold token handed to the client.
    pub reservation_token: Uuid,
}

impl Reservation {
    pub fn new(ride_id: Uuid, user_id: Uuid, hold_window: std::time::Duration) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id,
            user_id,
            seats_reserved: 1,
            reserved_at: now,
            expires_at: now + chrono::Duration::milliseconds(hold_window.as_millis() as i64),
            status: ReservationStatus::Pending,
            reservation_token: Uuid::new_v4(),
        }
    }

    pub fn is_lapsed(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaidStatus {
    Pending,
    Paid,
    Refunded,
    PartialRefund,
}

/// A confirmed seat purchase. Only ever created from a Confirmed reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub reservation_id: Uuid,
    pub seats_booked: i32,
    pub fare_amount_cents: i64,
    pub paid_status: PaidStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn from_reservation(reservation: &Reservation, fare_amount_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            ride_id: reservation.ride_id,
            user_id: reservation.user_id,
            reservation_id: reservation.id,
            seats_booked: reservation.seats_reserved,
            fare_amount_cents,
            paid_status: PaidStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Payment settlement transitions. Pending may become Paid; Paid may be
    /// refunded in full or in part.
    pub fn mark_paid(&mut self) -> Result<(), BookingError> {
        if self.paid_status != PaidStatus::Pending {
            return Err(BookingError::InvalidPaymentTransition {
                from: self.paid_status,
                to: PaidStatus::Paid,
            });
        }
        self.paid_status = PaidStatus::Paid;
        Ok(())
    }

    pub fn mark_refunded(&mut self, partial: bool) -> Result<(), BookingError> {
        let to = if partial {
            PaidStatus::PartialRefund
        } else {
            PaidStatus::Refunded
        };
        if self.paid_status != PaidStatus::Paid {
            return Err(BookingError::InvalidPaymentTransition {
                from: self.paid_status,
                to,
            });
        }
        self.paid_status = to;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid payment transition from {from:?} to {to:?}")]
    InvalidPaymentTransition { from: PaidStatus, to: PaidStatus },
}
