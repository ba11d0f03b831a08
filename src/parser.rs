//! Protobuf decoding of GTFS Realtime feeds.

use prost::Message;
use serde_json::Value;

use crate::error::Result;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns [`Error::Decode`](crate::error::Error::Decode) if the bytes are not
/// valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Serializes the whole decoded feed for the raw dump.
///
/// Unset fields and empty lists are dropped so the output only carries what
/// the producer actually sent. Enum fields stay numeric.
pub fn raw_json(feed: &FeedMessage) -> Result<Value> {
    let mut value = serde_json::to_value(feed)?;
    prune(&mut value);
    Ok(value)
}

fn prune(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| {
                prune(v);
                !matches!(v, Value::Null) && !matches!(v, Value::Array(a) if a.is_empty())
            });
        }
        Value::Array(items) => items.iter_mut().for_each(prune),
        _ => {}
    }
}
