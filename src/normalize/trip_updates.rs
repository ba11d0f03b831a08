use serde::{Deserialize, Serialize};

use crate::gtfs_rt::FeedMessage;
use crate::gtfs_rt::trip_update::StopTimeEvent;

/// Predicted arrival/departure at one stop of a trip.
///
/// Times and delays are present exactly when the producer set the matching
/// `arrival`/`departure` event; a set event with a zero delay stays `Some(0)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTimeUpdateRecord {
    pub stop_id: String,
    pub arrival: Option<i64>,
    pub departure: Option<i64>,
    pub arrival_delay: Option<i32>,
    pub departure_delay: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripUpdateRecord {
    pub trip_id: String,
    pub route_id: String,
    pub stop_time_updates: Vec<StopTimeUpdateRecord>,
}

/// A stop-time update joined with its trip, one CSV row per stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub route_id: String,
    pub stop_id: String,
    pub arrival: Option<i64>,
    pub departure: Option<i64>,
    pub arrival_delay: Option<i32>,
    pub departure_delay: Option<i32>,
}

/// Maps every trip-update entity of `feed` to a [`TripUpdateRecord`],
/// preserving the order of its stop-time updates.
pub fn normalize_trip_updates(feed: &FeedMessage) -> Vec<TripUpdateRecord> {
    feed.entity
        .iter()
        .filter_map(|e| e.trip_update.as_ref())
        .map(|tu| TripUpdateRecord {
            trip_id: tu.trip.trip_id.clone().unwrap_or_default(),
            route_id: tu.trip.route_id.clone().unwrap_or_default(),
            stop_time_updates: tu
                .stop_time_update
                .iter()
                .map(|s| StopTimeUpdateRecord {
                    stop_id: s.stop_id.clone().unwrap_or_default(),
                    arrival: event_time(s.arrival.as_ref()),
                    departure: event_time(s.departure.as_ref()),
                    arrival_delay: event_delay(s.arrival.as_ref()),
                    departure_delay: event_delay(s.departure.as_ref()),
                })
                .collect(),
        })
        .collect()
}

fn event_time(event: Option<&StopTimeEvent>) -> Option<i64> {
    event.map(|e| e.time.unwrap_or_default())
}

fn event_delay(event: Option<&StopTimeEvent>) -> Option<i32> {
    event.map(|e| e.delay.unwrap_or_default())
}

impl TripUpdateRecord {
    /// Flattens the nested stop-time updates into one row each.
    pub fn rows(&self) -> impl Iterator<Item = StopTimeRow> + '_ {
        self.stop_time_updates.iter().map(|s| StopTimeRow {
            trip_id: self.trip_id.clone(),
            route_id: self.route_id.clone(),
            stop_id: s.stop_id.clone(),
            arrival: s.arrival,
            departure: s.departure,
            arrival_delay: s.arrival_delay,
            departure_delay: s.departure_delay,
        })
    }
}
