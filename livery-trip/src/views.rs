use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Trip, TripStatus};

/// Dispatcher inbox: future trips that are still Pending, or Confirmed
/// but missing a driver. Soonest pickup first.
pub fn pending_for_dispatch(trips: &[Trip], now: DateTime<Utc>) -> Vec<Trip> {
    let mut out: Vec<Trip> = trips
        .iter()
        .filter(|t| {
            let is_future = t.pickup_time >= now;
            let needs_attention = t.status == TripStatus::Pending
                || (t.status == TripStatus::Confirmed && t.driver_id.is_none());
            is_future && needs_attention
        })
        .cloned()
        .collect();
    out.sort_by_key(|t| t.pickup_time);
    out
}

/// Driver's upcoming work: assigned, Confirmed, not yet departed.
pub fn next_for_driver(trips: &[Trip], driver_id: Uuid, now: DateTime<Utc>) -> Vec<Trip> {
    let mut out: Vec<Trip> = trips
        .iter()
        .filter(|t| {
            t.driver_id == Some(driver_id)
                && t.status == TripStatus::Confirmed
                && t.pickup_time >= now
        })
        .cloned()
        .collect();
    out.sort_by_key(|t| t.pickup_time);
    out
}

/// Trips the driver is actively running.
pub fn current_for_driver(trips: &[Trip], driver_id: Uuid) -> Vec<Trip> {
    let mut out: Vec<Trip> = trips
        .iter()
        .filter(|t| t.driver_id == Some(driver_id) && t.status == TripStatus::EnRoute)
        .cloned()
        .collect();
    out.sort_by_key(|t| t.pickup_time);
    out
}

/// Driver history, newest first.
pub fn past_for_driver(trips: &[Trip], driver_id: Uuid) -> Vec<Trip> {
    let mut out: Vec<Trip> = trips
        .iter()
        .filter(|t| t.driver_id == Some(driver_id) && t.status.is_terminal())
        .cloned()
        .collect();
    out.sort_by(|a, b| b.pickup_time.cmp(&a.pickup_time));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripDraft;
    use chrono::Duration;

    fn trip(
        pickup: DateTime<Utc>,
        status: TripStatus,
        driver: Option<Uuid>,
    ) -> Trip {
        let draft = TripDraft {
            pickup_address: "A".to_string(),
            dropoff_address: "B".to_string(),
            stop_address: None,
            pickup_latitude: None,
            pickup_longitude: None,
            dropoff_latitude: None,
            dropoff_longitude: None,
            pickup_time: pickup,
            arrival_time: None,
            passenger_count: 1,
            child_seats: 0,
            luggage_count: 0,
            has_pets: false,
            vehicle_id: None,
            driver_id: driver,
            total_price: 50.0,
            driver_notes: None,
            airline: None,
            flight_number: None,
        };
        let mut t = draft.into_trip(Uuid::new_v4());
        t.status = status;
        t
    }

    #[test]
    fn pending_view_includes_unassigned_confirmed() {
        let now = Utc::now();
        let later = now + Duration::hours(2);
        let driver = Uuid::new_v4();

        let pending = trip(later, TripStatus::Pending, None);
        let confirmed_no_driver = trip(later, TripStatus::Confirmed, None);
        let confirmed_assigned = trip(later, TripStatus::Confirmed, Some(driver));
        let past_pending = trip(now - Duration::hours(2), TripStatus::Pending, None);

        let all = vec![
            confirmed_assigned,
            pending.clone(),
            confirmed_no_driver.clone(),
            past_pending,
        ];
        let view = pending_for_dispatch(&all, now);
        assert_eq!(view.len(), 2);
        assert!(view.iter().any(|t| t.id == pending.id));
        assert!(view.iter().any(|t| t.id == confirmed_no_driver.id));
    }

    #[test]
    fn driver_views_partition_by_status() {
        let now = Utc::now();
        let driver = Uuid::new_v4();
        let other = Uuid::new_v4();

        let next = trip(now + Duration::hours(1), TripStatus::Confirmed, Some(driver));
        let current = trip(now - Duration::hours(1), TripStatus::EnRoute, Some(driver));
        let done = trip(now - Duration::days(1), TripStatus::Completed, Some(driver));
        let cancelled = trip(now - Duration::days(2), TripStatus::Cancelled, Some(driver));
        let not_mine = trip(now + Duration::hours(1), TripStatus::Confirmed, Some(other));

        let all = vec![
            next.clone(),
            current.clone(),
            done.clone(),
            cancelled.clone(),
            not_mine,
        ];

        let view = next_for_driver(&all, driver, now);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, next.id);

        let view = current_for_driver(&all, driver);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].id, current.id);

        let view = past_for_driver(&all, driver);
        assert_eq!(view.len(), 2);
        // Newest first
        assert_eq!(view[0].id, done.id);
        assert_eq!(view[1].id, cancelled.id);
    }
}
