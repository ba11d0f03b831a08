pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod static_feed;

pub mod gtfs_rt {
    include!(concat!(env!("OUT_DIR"), "/transit_realtime.rs"));
}
