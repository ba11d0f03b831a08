use serde::{Deserialize, Serialize};

use super::present;
use crate::error::{Error, Result};
use crate::gtfs_rt::alert::{Cause, Effect};
use crate::gtfs_rt::{FeedMessage, TranslatedString};

/// A GTFS entity an alert applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InformedEntityRecord {
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub stop_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub cause: String,
    pub effect: String,
    pub header: String,
    pub description: String,
    pub informed_entities: Vec<InformedEntityRecord>,
}

/// An alert joined with one of its informed entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRow {
    pub cause: String,
    pub effect: String,
    pub header: String,
    pub description: String,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
    pub stop_id: Option<String>,
}

/// Maps every alert entity of `feed` to an [`AlertRecord`].
///
/// Cause and effect are reported by their enumeration names; unset values
/// take the schema defaults `UNKNOWN_CAUSE` and `UNKNOWN_EFFECT`. Only the
/// first translation of the header and description is kept.
///
/// # Errors
///
/// Returns [`Error::UnknownEnumValue`] when a cause or effect code is not
/// part of the enumeration.
pub fn normalize_alerts(feed: &FeedMessage) -> Result<Vec<AlertRecord>> {
    let mut alerts = Vec::new();

    for alert in feed.entity.iter().filter_map(|e| e.alert.as_ref()) {
        let informed_entities = alert
            .informed_entity
            .iter()
            .map(|i| InformedEntityRecord {
                trip_id: present(i.trip.as_ref().and_then(|t| t.trip_id.as_ref())),
                route_id: present(i.route_id.as_ref()),
                stop_id: present(i.stop_id.as_ref()),
            })
            .collect();

        alerts.push(AlertRecord {
            cause: cause_name(alert.cause.unwrap_or(Cause::UnknownCause as i32))?,
            effect: effect_name(alert.effect.unwrap_or(Effect::UnknownEffect as i32))?,
            header: first_translation(alert.header_text.as_ref()),
            description: first_translation(alert.description_text.as_ref()),
            informed_entities,
        });
    }

    Ok(alerts)
}

fn cause_name(code: i32) -> Result<String> {
    Cause::try_from(code)
        .map(|c| c.as_str_name().to_string())
        .map_err(|_| Error::UnknownEnumValue {
            field: "cause",
            value: code,
        })
}

fn effect_name(code: i32) -> Result<String> {
    Effect::try_from(code)
        .map(|e| e.as_str_name().to_string())
        .map_err(|_| Error::UnknownEnumValue {
            field: "effect",
            value: code,
        })
}

fn first_translation(text: Option<&TranslatedString>) -> String {
    text.and_then(|t| t.translation.first())
        .map(|t| t.text.clone())
        .unwrap_or_default()
}

impl AlertRecord {
    /// Flattens the alert into one row per informed entity. An alert without
    /// informed entities still yields a single row with empty selectors.
    pub fn rows(&self) -> Vec<AlertRow> {
        let row = |entity: Option<&InformedEntityRecord>| AlertRow {
            cause: self.cause.clone(),
            effect: self.effect.clone(),
            header: self.header.clone(),
            description: self.description.clone(),
            trip_id: entity.and_then(|e| e.trip_id.clone()),
            route_id: entity.and_then(|e| e.route_id.clone()),
            stop_id: entity.and_then(|e| e.stop_id.clone()),
        };

        if self.informed_entities.is_empty() {
            vec![row(None)]
        } else {
            self.informed_entities.iter().map(|e| row(Some(e))).collect()
        }
    }
}
