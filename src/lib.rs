//! Raspberry Pi smart vent station
//!
//! Drivers for a DHT11 climate sensor, PIR motion sensor, MQ-2 gas sensor,
//! 1602 character LCD and hobby servo, the smart vent control loop built on
//! them, PubNub publishing of readings and an HTTP API for the servo.

pub mod cloud;
pub mod core;
pub mod hardware;
pub mod vent;
pub mod web;
