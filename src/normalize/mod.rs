//! Normalization of decoded GTFS-RT feeds into flat records.
//!
//! Each feed kind has a pure function that walks the feed entities in order,
//! keeps the ones carrying its variant and maps them into a record. Optional
//! values come out as `None` (JSON `null`) rather than the protobuf zero
//! value, so a consumer can tell "unset" from `0` or `""`.

pub mod alerts;
pub mod positions;
pub mod trip_updates;

pub use alerts::{AlertRecord, AlertRow, InformedEntityRecord, normalize_alerts};
pub use positions::{VehiclePositionRecord, normalize_positions};
pub use trip_updates::{StopTimeRow, StopTimeUpdateRecord, TripUpdateRecord, normalize_trip_updates};

/// Returns an owned copy of an optional string field, treating `""` as unset.
pub(crate) fn present(value: Option<&String>) -> Option<String> {
    value.filter(|s| !s.is_empty()).cloned()
}
