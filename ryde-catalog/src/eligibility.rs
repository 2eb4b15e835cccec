use crate::listing::{GenderPreference, SeatListing, Visibility};
use ryde_shared::{Gender, UserProfile};
use serde::{Deserialize, Serialize};

/// Outcome of a passed admission check. `approval_required` marks the
/// FemalePreferred soft restriction: the rider may request the seat but the
/// host has to approve.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Admission {
    pub approval_required: bool,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("You must be verified to book rides")]
    NotVerified,

    #[error("Your account is restricted")]
    Blacklisted,

    #[error("This ride is Female Only")]
    GenderRestricted,

    #[error("This ride is limited to community members")]
    VisibilityRestricted,

    #[error("No seats available")]
    NoSeatsLeft,
}

/// Admission check run before any seat is held. Rules are evaluated in
/// order; the first failure wins.
pub fn check_eligibility<L: SeatListing>(
    listing: &L,
    user: &UserProfile,
) -> Result<Admission, EligibilityError> {
    if !user.verified {
        return Err(EligibilityError::NotVerified);
    }
    if user.blacklisted {
        return Err(EligibilityError::Blacklisted);
    }

    let mut approval_required = false;
    match listing.gender_preference() {
        GenderPreference::FemaleOnly if user.gender == Gender::Male => {
            return Err(EligibilityError::GenderRestricted);
        }
        GenderPreference::FemalePreferred if user.gender == Gender::Male => {
            approval_required = true;
        }
        _ => {}
    }

    if listing.visibility() == Visibility::CommunityOnly {
        let member = listing
            .community_id()
            .map(|c| user.in_community(c))
            .unwrap_or(false);
        if !member {
            return Err(EligibilityError::VisibilityRestricted);
        }
    }

    if listing.seats_left() < 1 {
        return Err(EligibilityError::NoSeatsLeft);
    }

    Ok(Admission { approval_required })
}

/// Listing-side visibility filter for search results. FemaleOnly listings
/// are hidden from male users outright, not merely unbookable; the same goes
/// for community-only listings and non-members.
pub fn is_visible_to<L: SeatListing>(listing: &L, user: &UserProfile) -> bool {
    if listing.gender_preference() == GenderPreference::FemaleOnly && user.gender == Gender::Male {
        return false;
    }
    if listing.visibility() == Visibility::CommunityOnly {
        return listing
            .community_id()
            .map(|c| user.in_community(c))
            .unwrap_or(false);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::Ride;
    use chrono::Utc;
    use ryde_shared::Location;
    use uuid::Uuid;

    fn ride() -> Ride {
        Ride::new(
            Uuid::new_v4(),
            Location::new("Koramangala", 12.93, 77.62),
            Location::new("Airport", 13.19, 77.70),
            Utc::now(),
            2,
            30000,
        )
        .unwrap()
    }

    fn user(gender: Gender) -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            full_name: "Test Rider".to_string(),
            gender,
            verified: true,
            blacklisted: false,
            communities: vec![],
        }
    }

    #[test]
    fn test_verification_checked_first() {
        let mut listing = ride();
        listing.gender_preference = GenderPreference::FemaleOnly;
        let mut rider = user(Gender::Male);
        rider.verified = false;

        // Unverified beats the gender rule in the evaluation order.
        assert_eq!(
            check_eligibility(&listing, &rider),
            Err(EligibilityError::NotVerified)
        );
    }

    #[test]
    fn test_blacklisted_rejected() {
        let listing = ride();
        let mut rider = user(Gender::Female);
        rider.blacklisted = true;
        assert_eq!(
            check_eligibility(&listing, &rider),
            Err(EligibilityError::Blacklisted)
        );
    }

    #[test]
    fn test_female_only_hard_block() {
        let mut listing = ride();
        listing.gender_preference = GenderPreference::FemaleOnly;

        let male = user(Gender::Male);
        assert_eq!(
            check_eligibility(&listing, &male),
            Err(EligibilityError::GenderRestricted)
        );
        assert!(!is_visible_to(&listing, &male));

        let female = user(Gender::Female);
        assert_eq!(
            check_eligibility(&listing, &female),
            Ok(Admission {
                approval_required: false
            })
        );
        assert!(is_visible_to(&listing, &female));
    }

    #[test]
    fn test_female_preferred_soft_restriction() {
        let mut listing = ride();
        listing.gender_preference = GenderPreference::FemalePreferred;

        let male = user(Gender::Male);
        assert_eq!(
            check_eligibility(&listing, &male),
            Ok(Admission {
                approval_required: true
            })
        );
        // Soft restriction: still visible in search.
        assert!(is_visible_to(&listing, &male));
    }

    #[test]
    fn test_community_only_membership() {
        let mut listing = ride();
        listing.visibility = Visibility::CommunityOnly;
        listing.community_id = Some("acme-corp".to_string());

        let outsider = user(Gender::Female);
        assert_eq!(
            check_eligibility(&listing, &outsider),
            Err(EligibilityError::VisibilityRestricted)
        );
        assert!(!is_visible_to(&listing, &outsider));

        let mut member = user(Gender::Female);
        member.communities.push("acme-corp".to_string());
        assert!(check_eligibility(&listing, &member).is_ok());
        assert!(is_visible_to(&listing, &member));
    }

    #[test]
    fn test_no_seats_left() {
        let mut listing = ride();
        listing.seats_available = 0;
        assert_eq!(
            check_eligibility(&listing, &user(Gender::Female)),
            Err(EligibilityError::NoSeatsLeft)
        );
    }
}
