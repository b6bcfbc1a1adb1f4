use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use livery_fleet::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{Trip, TripEvent, TripEventType, TripStatus};

/// Billable duration of a trip in hours, derived purely from its event
/// log: first passenger_picked to first completed. Missing either event,
/// or a completed stamp before the pickup stamp, yields zero.
pub fn trip_duration_hours(trip_id: Uuid, events: &[TripEvent]) -> f64 {
    let picked = first_event(trip_id, events, TripEventType::PassengerPicked);
    let completed = first_event(trip_id, events, TripEventType::Completed);

    match (picked, completed) {
        (Some(picked), Some(completed)) => {
            let millis = (completed.timestamp - picked.timestamp).num_milliseconds();
            if millis <= 0 {
                0.0
            } else {
                millis as f64 / (1000.0 * 60.0 * 60.0)
            }
        }
        _ => 0.0,
    }
}

/// Driver payout for one trip: billable hours times the hourly rate.
pub fn trip_earnings(trip_id: Uuid, events: &[TripEvent], hourly_rate: f64) -> f64 {
    trip_duration_hours(trip_id, events) * hourly_rate
}

/// "1h 30m" style rendering. Non-positive durations render as "N/A",
/// never "0h 0m".
pub fn format_duration(duration_hours: f64) -> String {
    if duration_hours <= 0.0 {
        return "N/A".to_string();
    }
    let hours = duration_hours.floor() as i64;
    let minutes = ((duration_hours - hours as f64) * 60.0).round() as i64;
    format!("{}h {}m", hours, minutes)
}

fn first_event(trip_id: Uuid, events: &[TripEvent], kind: TripEventType) -> Option<&TripEvent> {
    events
        .iter()
        .filter(|e| e.trip_id == trip_id && e.event_type == kind)
        .min_by_key(|e| e.timestamp)
}

/// Dispatcher-side filter over completed trips. Day bounds are inclusive
/// and evaluated against pickup_time: `from` starts at 00:00:00 and `to`
/// runs through the end of that day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EarningsFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub driver_id: Option<Uuid>,
}

impl EarningsFilter {
    pub fn matches(&self, trip: &Trip) -> bool {
        if let Some(driver_id) = self.driver_id {
            if trip.driver_id != Some(driver_id) {
                return false;
            }
        }
        if let Some(from) = self.from {
            if trip.pickup_time < start_of_day(from) {
                return false;
            }
        }
        if let Some(to) = self.to {
            if trip.pickup_time > end_of_day(to) {
                return false;
            }
        }
        true
    }
}

/// One line of the dispatcher earnings table.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsRow {
    pub trip_id: Uuid,
    pub pickup_time: DateTime<Utc>,
    pub driver_id: Uuid,
    pub driver_name: String,
    pub duration: String,
    pub gross: f64,
    pub payout: f64,
    pub net: f64,
}

/// Aggregated dispatcher view over a filtered set of completed trips.
#[derive(Debug, Clone, Serialize)]
pub struct EarningsSummary {
    pub gross: f64,
    pub payout: f64,
    pub net: f64,
    pub trip_count: usize,
    pub rows: Vec<EarningsRow>,
}

/// Build the dispatcher summary. Only Completed trips with an assigned
/// driver participate; everything else never earned money.
pub fn summarize(
    trips: &[Trip],
    events_by_trip: &HashMap<Uuid, Vec<TripEvent>>,
    users_by_id: &HashMap<Uuid, User>,
    filter: &EarningsFilter,
) -> EarningsSummary {
    let mut rows = Vec::new();
    let mut gross = 0.0;
    let mut payout = 0.0;

    for trip in trips {
        if trip.status != TripStatus::Completed {
            continue;
        }
        let Some(driver_id) = trip.driver_id else {
            continue;
        };
        if !filter.matches(trip) {
            continue;
        }

        let events = events_by_trip
            .get(&trip.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let rate = users_by_id.get(&driver_id).map(User::rate).unwrap_or(0.0);
        let duration_hours = trip_duration_hours(trip.id, events);
        let trip_payout = duration_hours * rate;

        gross += trip.total_price;
        payout += trip_payout;
        rows.push(EarningsRow {
            trip_id: trip.id,
            pickup_time: trip.pickup_time,
            driver_id,
            driver_name: users_by_id
                .get(&driver_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Unknown Driver".to_string()),
            duration: format_duration(duration_hours),
            gross: trip.total_price,
            payout: trip_payout,
            net: trip.total_price - trip_payout,
        });
    }

    rows.sort_by(|a, b| b.pickup_time.cmp(&a.pickup_time));

    EarningsSummary {
        gross,
        payout,
        net: gross - payout,
        trip_count: rows.len(),
        rows,
    }
}

/// Preset windows the driver wallet offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletWindow {
    Week,
    Month,
    Year,
}

impl WalletWindow {
    /// Start of the window, evaluated at `now`: trailing seven days
    /// including today, calendar month to date, or calendar year to date.
    pub fn starts_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let date = match self {
            WalletWindow::Week => today - Duration::days(6),
            WalletWindow::Month => NaiveDate::from_ymd_opt(today.year(), today.month(), 1)
                .unwrap_or(today),
            WalletWindow::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        start_of_day(date)
    }
}

/// One completed trip as the wallet lists it.
#[derive(Debug, Clone, Serialize)]
pub struct WalletRow {
    pub trip_id: Uuid,
    pub pickup_time: DateTime<Utc>,
    pub dropoff_address: String,
    pub duration: String,
    pub earnings: f64,
}

/// Per-driver earnings over a preset window.
#[derive(Debug, Clone, Serialize)]
pub struct WalletStatement {
    pub window: WalletWindow,
    pub total_earnings: f64,
    pub trip_count: usize,
    pub trips: Vec<WalletRow>,
}

/// Build a driver's wallet for the chosen window ending now.
pub fn wallet_statement(
    driver: &User,
    trips: &[Trip],
    events_by_trip: &HashMap<Uuid, Vec<TripEvent>>,
    window: WalletWindow,
    now: DateTime<Utc>,
) -> WalletStatement {
    let start = window.starts_at(now);
    let end = end_of_day(now.date_naive());
    let rate = driver.rate();

    let mut rows = Vec::new();
    let mut total = 0.0;

    for trip in trips {
        if trip.status != TripStatus::Completed || trip.driver_id != Some(driver.id) {
            continue;
        }
        if trip.pickup_time < start || trip.pickup_time > end {
            continue;
        }

        let events = events_by_trip
            .get(&trip.id)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let duration_hours = trip_duration_hours(trip.id, events);
        let earnings = duration_hours * rate;

        total += earnings;
        rows.push(WalletRow {
            trip_id: trip.id,
            pickup_time: trip.pickup_time,
            dropoff_address: trip.dropoff_address.clone(),
            duration: format_duration(duration_hours),
            earnings,
        });
    }

    rows.sort_by(|a, b| b.pickup_time.cmp(&a.pickup_time));

    WalletStatement {
        window,
        total_earnings: total,
        trip_count: rows.len(),
        trips: rows,
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&date.and_time(end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TripDraft;

    fn trip_at(pickup: DateTime<Utc>, price: f64, driver: Option<Uuid>) -> Trip {
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
            total_price: price,
            driver_notes: None,
            airline: None,
            flight_number: None,
        };
        let mut trip = draft.into_trip(Uuid::new_v4());
        trip.status = TripStatus::Completed;
        trip
    }

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn pair(trip_id: Uuid, driver: Uuid, picked: &str, completed: &str) -> Vec<TripEvent> {
        vec![
            TripEvent::at(
                trip_id,
                TripEventType::PassengerPicked,
                Some(driver),
                ts(picked),
            ),
            TripEvent::at(trip_id, TripEventType::Completed, Some(driver), ts(completed)),
        ]
    }

    #[test]
    fn ninety_minutes_at_forty_pays_sixty() {
        let trip_id = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let events = pair(
            trip_id,
            driver,
            "2025-03-01T10:00:00Z",
            "2025-03-01T11:30:00Z",
        );

        let hours = trip_duration_hours(trip_id, &events);
        assert!((hours - 1.5).abs() < 1e-9);
        assert!((trip_earnings(trip_id, &events, 40.0) - 60.0).abs() < 1e-9);
        assert_eq!(format_duration(hours), "1h 30m");
    }

    #[test]
    fn missing_or_reversed_events_yield_zero() {
        let trip_id = Uuid::new_v4();
        let driver = Uuid::new_v4();

        // Completed stamped before pickup
        let events = pair(
            trip_id,
            driver,
            "2025-03-01T11:30:00Z",
            "2025-03-01T10:00:00Z",
        );
        assert_eq!(trip_duration_hours(trip_id, &events), 0.0);
        assert_eq!(format_duration(0.0), "N/A");

        // No completed event at all
        let events = vec![TripEvent::at(
            trip_id,
            TripEventType::PassengerPicked,
            Some(driver),
            ts("2025-03-01T10:00:00Z"),
        )];
        assert_eq!(trip_duration_hours(trip_id, &events), 0.0);
    }

    #[test]
    fn first_pair_wins_in_malformed_logs() {
        let trip_id = Uuid::new_v4();
        let driver = Uuid::new_v4();
        let mut events = pair(
            trip_id,
            driver,
            "2025-03-01T10:00:00Z",
            "2025-03-01T11:00:00Z",
        );
        // A later duplicate pair must not change the answer
        events.extend(pair(
            trip_id,
            driver,
            "2025-03-01T12:00:00Z",
            "2025-03-01T15:00:00Z",
        ));

        assert!((trip_duration_hours(trip_id, &events) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn summary_totals_match_vectors() {
        let driver = Uuid::new_v4();
        let user = User::new_driver(
            "Sam".to_string(),
            "sam@example.com".to_string(),
            "5550002222".to_string(),
            20.0,
        );
        let driver = {
            let mut u = user;
            u.id = driver;
            u
        };

        // Gross 100/50/75; payouts 20/10/0 at rate 20
        let t1 = trip_at(ts("2025-03-01T09:00:00Z"), 100.0, Some(driver.id));
        let t2 = trip_at(ts("2025-03-02T09:00:00Z"), 50.0, Some(driver.id));
        let t3 = trip_at(ts("2025-03-03T09:00:00Z"), 75.0, Some(driver.id));

        let mut events_by_trip = HashMap::new();
        events_by_trip.insert(
            t1.id,
            pair(t1.id, driver.id, "2025-03-01T09:00:00Z", "2025-03-01T10:00:00Z"),
        );
        events_by_trip.insert(
            t2.id,
            pair(t2.id, driver.id, "2025-03-02T09:00:00Z", "2025-03-02T09:30:00Z"),
        );
        events_by_trip.insert(t3.id, Vec::new());

        let mut users_by_id = HashMap::new();
        users_by_id.insert(driver.id, driver.clone());

        let trips = vec![t1, t2, t3];
        let summary = summarize(
            &trips,
            &events_by_trip,
            &users_by_id,
            &EarningsFilter::default(),
        );

        assert_eq!(summary.trip_count, 3);
        assert!((summary.gross - 225.0).abs() < 1e-9);
        assert!((summary.payout - 30.0).abs() < 1e-9);
        assert!((summary.net - 195.0).abs() < 1e-9);
        assert_eq!(summary.rows[summary.rows.len() - 1].duration, "1h 0m");
    }

    #[test]
    fn non_completed_and_unassigned_trips_are_excluded() {
        let driver = Uuid::new_v4();
        let mut active = trip_at(ts("2025-03-01T09:00:00Z"), 100.0, Some(driver));
        active.status = TripStatus::EnRoute;
        let unassigned = trip_at(ts("2025-03-01T09:00:00Z"), 100.0, None);

        let summary = summarize(
            &[active, unassigned],
            &HashMap::new(),
            &HashMap::new(),
            &EarningsFilter::default(),
        );
        assert_eq!(summary.trip_count, 0);
        assert_eq!(summary.gross, 0.0);
    }

    #[test]
    fn date_filter_is_inclusive_at_day_bounds() {
        let driver = Uuid::new_v4();
        let filter = EarningsFilter {
            from: Some("2025-03-01".parse().unwrap()),
            to: Some("2025-03-02".parse().unwrap()),
            driver_id: None,
        };

        // Last second of the `to` day is still inside
        let edge = trip_at(ts("2025-03-02T23:59:59Z"), 10.0, Some(driver));
        assert!(filter.matches(&edge));

        let before = trip_at(ts("2025-02-28T23:59:59Z"), 10.0, Some(driver));
        assert!(!filter.matches(&before));

        let after = trip_at(ts("2025-03-03T00:00:00Z"), 10.0, Some(driver));
        assert!(!filter.matches(&after));
    }

    #[test]
    fn driver_filter_scopes_rows() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let filter = EarningsFilter {
            driver_id: Some(a),
            ..Default::default()
        };
        assert!(filter.matches(&trip_at(ts("2025-03-01T09:00:00Z"), 10.0, Some(a))));
        assert!(!filter.matches(&trip_at(ts("2025-03-01T09:00:00Z"), 10.0, Some(b))));
    }

    #[test]
    fn wallet_windows_start_where_expected() {
        let now = ts("2025-03-15T12:00:00Z");
        assert_eq!(
            WalletWindow::Week.starts_at(now),
            ts("2025-03-09T00:00:00Z")
        );
        assert_eq!(
            WalletWindow::Month.starts_at(now),
            ts("2025-03-01T00:00:00Z")
        );
        assert_eq!(
            WalletWindow::Year.starts_at(now),
            ts("2025-01-01T00:00:00Z")
        );
    }

    #[test]
    fn wallet_statement_sums_only_window_trips() {
        let mut driver = User::new_driver(
            "Sam".to_string(),
            "sam@example.com".to_string(),
            "5550002222".to_string(),
            40.0,
        );
        driver.id = Uuid::new_v4();

        let now = ts("2025-03-15T12:00:00Z");
        let inside = trip_at(ts("2025-03-10T09:00:00Z"), 100.0, Some(driver.id));
        let outside = trip_at(ts("2025-01-10T09:00:00Z"), 100.0, Some(driver.id));

        let mut events_by_trip = HashMap::new();
        events_by_trip.insert(
            inside.id,
            pair(
                inside.id,
                driver.id,
                "2025-03-10T09:00:00Z",
                "2025-03-10T10:30:00Z",
            ),
        );
        events_by_trip.insert(
            outside.id,
            pair(
                outside.id,
                driver.id,
                "2025-01-10T09:00:00Z",
                "2025-01-10T10:00:00Z",
            ),
        );

        let statement = wallet_statement(
            &driver,
            &[inside, outside],
            &events_by_trip,
            WalletWindow::Week,
            now,
        );
        assert_eq!(statement.trip_count, 1);
        assert!((statement.total_earnings - 60.0).abs() < 1e-9);
        assert_eq!(statement.trips[0].duration, "1h 30m");

        // Year window picks up both
        let statement = wallet_statement(
            &driver,
            &[
                trip_at(ts("2025-03-10T09:00:00Z"), 100.0, Some(driver.id)),
            ],
            &HashMap::new(),
            WalletWindow::Year,
            now,
        );
        assert_eq!(statement.trip_count, 1);
        assert_eq!(statement.trips[0].duration, "N/A");
        assert_eq!(statement.total_earnings, 0.0);
    }
}
