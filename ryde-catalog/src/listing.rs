use chrono::{DateTime, Utc};
use ryde_shared::Location;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Gender-based access policy on a listing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenderPreference {
    FemaleOnly,
    FemalePreferred,
    Anyone,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    CommunityOnly,
    InviteOnly,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Scheduled,
    Ongoing,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CabStatus {
    Open,
    Full,
    Ongoing,
    Completed,
    Cancelled,
}

/// A driver-hosted carpool listing. Seat counters are owned by the Seat
/// Ledger; nothing else mutates them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub host_driver_id: Uuid,
    pub vehicle_id: Option<Uuid>,
    pub start_point: Location,
    pub destination: Location,
    pub start_time: DateTime<Utc>,
    pub seat_capacity: i32,
    pub seats_available: i32,
    pub base_price_cents: i64,
    pub gender_preference: GenderPreference,
    pub visibility: Visibility,
    pub community_id: Option<String>,
    pub status: RideStatus,
    pub estimated_distance_km: Option<f64>,
    pub driver_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Ride {
    pub fn new(
        host_driver_id: Uuid,
        start_point: Location,
        destination: Location,
        start_time: DateTime<Utc>,
        seat_capacity: i32,
        base_price_cents: i64,
    ) -> Result<Self, ListingError> {
        if seat_capacity < 1 {
            return Err(ListingError::InvalidCapacity(seat_capacity));
        }
        if base_price_cents < 0 {
            return Err(ListingError::InvalidPrice(base_price_cents));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            host_driver_id,
            vehicle_id: None,
            start_point,
            destination,
            start_time,
            seat_capacity,
            seats_available: seat_capacity,
            base_price_cents,
            gender_preference: GenderPreference::Anyone,
            visibility: Visibility::Public,
            community_id: None,
            status: RideStatus::Scheduled,
            estimated_distance_km: None,
            driver_notes: None,
            created_at: Utc::now(),
        })
    }

    pub fn is_bookable(&self) -> bool {
        self.status == RideStatus::Scheduled && self.seats_available > 0
    }
}

/// One rider's computed share of a shared cab fare.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiderShare {
    pub user_id: Uuid,
    pub distance_km: Option<f64>,
    pub fare_share_cents: i64,
}

/// A host reselling empty seats in a cab they already booked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedCab {
    pub id: Uuid,
    pub host_user_id: Uuid,
    pub cab_service: Option<String>,
    pub pickup_point: Location,
    pub drop_point: Location,
    pub start_time: DateTime<Utc>,
    pub total_cab_fare_cents: i64,
    pub seats_offered: i32,
    pub seats_filled: i32,
    pub total_distance_km: Option<f64>,
    pub per_rider_share: Vec<RiderShare>,
    pub status: CabStatus,
    pub gender_preference: GenderPreference,
    pub visibility: Visibility,
    pub community_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SharedCab {
    pub fn new(
        host_user_id: Uuid,
        pickup_point: Location,
        drop_point: Location,
        start_time: DateTime<Utc>,
        total_cab_fare_cents: i64,
        seats_offered: i32,
    ) -> Result<Self, ListingError> {
        if seats_offered < 1 {
            return Err(ListingError::InvalidCapacity(seats_offered));
        }
        if total_cab_fare_cents < 0 {
            return Err(ListingError::InvalidPrice(total_cab_fare_cents));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            host_user_id,
            cab_service: None,
            pickup_point,
            drop_point,
            start_time,
            total_cab_fare_cents,
            seats_offered,
            seats_filled: 0,
            total_distance_km: None,
            per_rider_share: Vec::new(),
            status: CabStatus::Open,
            gender_preference: GenderPreference::Anyone,
            visibility: Visibility::Public,
            community_id: None,
            created_at: Utc::now(),
        })
    }

    /// Flip between Open and Full as the roster changes. Other statuses
    /// (Ongoing, Completed, Cancelled) are never touched here.
    pub fn refresh_fill_status(&mut self) {
        match self.status {
            CabStatus::Open if self.seats_filled >= self.seats_offered => {
                self.status = CabStatus::Full;
            }
            CabStatus::Full if self.seats_filled < self.seats_offered => {
                self.status = CabStatus::Open;
            }
            _ => {}
        }
    }
}

/// Common admission surface over anything with bookable seats.
pub trait SeatListing {
    fn listing_id(&self) -> Uuid;
    fn gender_preference(&self) -> GenderPreference;
    fn visibility(&self) -> Visibility;
    fn community_id(&self) -> Option<&str>;
    fn seats_left(&self) -> i32;
    fn seat_capacity(&self) -> i32;
}

impl SeatListing for Ride {
    fn listing_id(&self) -> Uuid {
        self.id
    }
    fn gender_preference(&self) -> GenderPreference {
        self.gender_preference
    }
    fn visibility(&self) -> Visibility {
        self.visibility
    }
    fn community_id(&self) -> Option<&str> {
        self.community_id.as_deref()
    }
    fn seats_left(&self) -> i32 {
        self.seats_available
    }
    fn seat_capacity(&self) -> i32 {
        self.seat_capacity
    }
}

impl SeatListing for SharedCab {
    fn listing_id(&self) -> Uuid {
        self.id
    }
    fn gender_preference(&self) -> GenderPreference {
        self.gender_preference
    }
    fn visibility(&self) -> Visibility {
        self.visibility
    }
    fn community_id(&self) -> Option<&str> {
        self.community_id.as_deref()
    }
    fn seats_left(&self) -> i32 {
        self.seats_offered - self.seats_filled
    }
    fn seat_capacity(&self) -> i32 {
        self.seats_offered
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("Seat capacity must be at least 1, got {0}")]
    InvalidCapacity(i32),

    #[error("Price must not be negative, got {0}")]
    InvalidPrice(i64),
}
