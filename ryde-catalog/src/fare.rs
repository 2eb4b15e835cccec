//! Fare splitting for shared cabs. Pure computation, money in integer cents.

use crate::listing::{RiderShare, SharedCab};
use uuid::Uuid;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FareError {
    #[error("Cannot split a fare across an empty roster")]
    NoRiders,

    #[error("Total rider distance must be positive for distance weighting")]
    ZeroDistance,
}

/// Equal-split share per rider: `total / (seats_offered + 1)`. The +1 is the
/// host's own implicit unit of the split. Rounded to the nearest cent.
pub fn equal_share(total_cab_fare_cents: i64, seats_offered: i32) -> i64 {
    let parts = seats_offered as f64 + 1.0;
    (total_cab_fare_cents as f64 / parts).round() as i64
}

/// Distance-weighted shares: each rider pays `total × dᵢ / Σd`. The last
/// rider absorbs the rounding remainder so the shares sum exactly to the
/// total fare.
pub fn distance_weighted_shares(
    total_cab_fare_cents: i64,
    riders: &[(Uuid, f64)],
) -> Result<Vec<RiderShare>, FareError> {
    if riders.is_empty() {
        return Err(FareError::NoRiders);
    }
    let total_distance: f64 = riders.iter().map(|(_, d)| d).sum();
    if total_distance <= 0.0 {
        return Err(FareError::ZeroDistance);
    }

    let mut shares = Vec::with_capacity(riders.len());
    let mut allocated: i64 = 0;
    for (i, (user_id, distance_km)) in riders.iter().enumerate() {
        let share = if i == riders.len() - 1 {
            total_cab_fare_cents - allocated
        } else {
            (total_cab_fare_cents as f64 * distance_km / total_distance).round() as i64
        };
        allocated += share;
        shares.push(RiderShare {
            user_id: *user_id,
            distance_km: Some(*distance_km),
            fare_share_cents: share,
        });
    }
    Ok(shares)
}

/// Recompute `per_rider_share` for the current roster. Uses distance
/// weighting when every rider has a known distance, equal split otherwise.
/// Called whenever `seats_filled` or the roster changes.
pub fn recompute_shares(
    cab: &mut SharedCab,
    roster: &[(Uuid, Option<f64>)],
) -> Result<(), FareError> {
    if roster.is_empty() {
        cab.per_rider_share.clear();
        return Ok(());
    }

    let all_distances_known = roster.iter().all(|(_, d)| d.is_some());
    if all_distances_known {
        let riders: Vec<(Uuid, f64)> = roster
            .iter()
            .map(|(u, d)| (*u, d.unwrap_or_default()))
            .collect();
        cab.per_rider_share = distance_weighted_shares(cab.total_cab_fare_cents, &riders)?;
    } else {
        let share = equal_share(cab.total_cab_fare_cents, cab.seats_offered);
        cab.per_rider_share = roster
            .iter()
            .map(|(user_id, distance_km)| RiderShare {
                user_id: *user_id,
                distance_km: *distance_km,
                fare_share_cents: share,
            })
            .collect();
    }
    Ok(())
}

/// Apply a roster change (join or leave) to a cab: seat count, Open/Full
/// status and fare shares all move together.
pub fn sync_roster(cab: &mut SharedCab, roster: &[(Uuid, Option<f64>)]) -> Result<(), FareError> {
    cab.seats_filled = roster.len() as i32;
    cab.refresh_fill_status();
    recompute_shares(cab, roster)
}
