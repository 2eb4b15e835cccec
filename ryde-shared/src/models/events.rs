use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct SeatReservedEvent {
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub reservation_token: Uuid,
    pub expires_at: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationExpiredEvent {
    pub ride_id: Uuid,
    pub reservation_token: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCancelledEvent {
    pub ride_id: Uuid,
    pub reservation_token: Uuid,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub fare_amount_cents: i64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OfferDecidedEvent {
    pub offer_id: Uuid,
    pub ride_id: Uuid,
    pub proposer_id: Uuid,
    /// Terminal status the offer landed in, wire form.
    pub status: String,
    pub timestamp: i64,
}

/// Union fanned out on the engine's broadcast channel so subscribers
/// (SSE bridges, notification workers) get a single subscription.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    SeatReserved(SeatReservedEvent),
    ReservationExpired(ReservationExpiredEvent),
    ReservationCancelled(ReservationCancelledEvent),
    BookingConfirmed(BookingConfirmedEvent),
    OfferDecided(OfferDecidedEvent),
}
