use serde::{Deserialize, Serialize};

use super::present;
use crate::gtfs_rt::FeedMessage;

/// One vehicle position, flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePositionRecord {
    pub vehicle_id: Option<String>,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub lat: Option<f32>,
    pub lon: Option<f32>,
    pub timestamp: Option<u64>,
}

/// Maps every vehicle entity of `feed` to a [`VehiclePositionRecord`].
///
/// `lat`/`lon` are set only when the position sub-message is present. A
/// timestamp of `0` is reported as absent.
pub fn normalize_positions(feed: &FeedMessage) -> Vec<VehiclePositionRecord> {
    feed.entity
        .iter()
        .filter_map(|e| e.vehicle.as_ref())
        .map(|v| {
            let trip = v.trip.as_ref();
            VehiclePositionRecord {
                vehicle_id: present(v.vehicle.as_ref().and_then(|d| d.id.as_ref())),
                trip_id: present(trip.and_then(|t| t.trip_id.as_ref())),
                route_id: present(trip.and_then(|t| t.route_id.as_ref())),
                lat: v.position.as_ref().map(|p| p.latitude),
                lon: v.position.as_ref().map(|p| p.longitude),
                timestamp: v.timestamp.filter(|&ts| ts != 0),
            }
        })
        .collect()
}
