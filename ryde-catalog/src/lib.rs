pub mod eligibility;
pub mod fare;
pub mod listing;

pub use eligibility::{check_eligibility, is_visible_to, Admission, EligibilityError};
pub use fare::{distance_weighted_shares, equal_share, recompute_shares, sync_roster, FareError};
pub use listing::{
    CabStatus, GenderPreference, Ride, RideStatus, RiderShare, SeatListing, SharedCab, Visibility,
};
