//! Result filtering
//!
//! Applies the distance acceptance test and the page-size cut to provider
//! results. Price is not checked here: the price range is part of the
//! provider query.

use crate::hotels::HotelRecord;
use crate::validators::DistanceRange;

/// Whether `hotel` passes the distance test.
///
/// A hotel without a usable distance never passes, with or without a range.
/// `None` means no range was supplied, so any known distance passes; an
/// explicit range, including `0-0`, is taken literally.
pub fn accepts(hotel: &HotelRecord, distance: Option<&DistanceRange>) -> bool {
    match (hotel.distance_km.value(), distance) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(km), Some(range)) => range.contains(*km),
    }
}

/// Keep at most `limit` accepted hotels, in provider order.
///
/// Stops consuming input as soon as `limit` hotels are accepted, so the
/// provider's price ordering decides which hotels make the cut.
pub fn select_hotels(
    hotels: impl IntoIterator<Item = HotelRecord>,
    limit: usize,
    distance: Option<&DistanceRange>,
) -> Vec<HotelRecord> {
    hotels
        .into_iter()
        .filter(|hotel| accepts(hotel, distance))
        .take(limit)
        .collect()
}
