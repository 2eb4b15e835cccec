use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Counter-offer lifecycle. Everything but Pending is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
    Expired,
    Withdrawn,
}

impl OfferStatus {
    pub fn is_terminal(&self) -> bool {
        *self != OfferStatus::Pending
    }
}

/// A rider's counter-offer against a ride's base price. While `seat_locked`
/// is true the offer holds one seat through the ledger, exactly like a
/// reservation does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub proposer_id: Uuid,
    pub original_price_cents: i64,
    pub offered_amount_cents: i64,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub seat_locked: bool,
    pub driver_response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Offer {
    pub fn new(
        ride_id: Uuid,
        proposer_id: Uuid,
        original_price_cents: i64,
        offered_amount_cents: i64,
        ttl: std::time::Duration,
        seat_locked: bool,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id,
            proposer_id,
            original_price_cents,
            offered_amount_cents,
            status: OfferStatus::Pending,
            expires_at: now + chrono::Duration::milliseconds(ttl.as_millis() as i64),
            seat_locked,
            driver_response: None,
            responded_at: None,
            created_at: now,
        }
    }

    pub fn is_lapsed(&self) -> bool {
        Utc::now() > self.expires_at
    }

    pub fn is_active(&self) -> bool {
        self.status == OfferStatus::Pending && !self.is_lapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_offer_is_active() {
        let offer = Offer::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            30000,
            25000,
            Duration::from_secs(900),
            true,
        );
        assert!(offer.is_active());
        assert!(!offer.status.is_terminal());
        assert!(offer.seat_locked);
    }

    #[test]
    fn test_lapsed_offer_not_active() {
        let mut offer = Offer::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            30000,
            25000,
            Duration::from_secs(900),
            false,
        );
        offer.expires_at = Utc::now() - chrono::Duration::minutes(1);
        assert!(offer.is_lapsed());
        assert!(!offer.is_active());
    }
}
