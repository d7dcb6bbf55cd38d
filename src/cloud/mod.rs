//! Cloud pub/sub publishing of sensor readings

pub mod publisher;

pub use publisher::{parse_publish_response, PubNubPublisher, Publisher, SensorMessage};
