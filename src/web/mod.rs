//! HTTP API for remote servo control

pub mod control;
pub mod handlers;
pub mod models;
pub mod server;

pub use control::ServoController;
pub use server::{configure, cors_headers, json_config, local_ip_address, start_server};
