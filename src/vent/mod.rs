//! Smart vent control: the decision policy, the LCD pages, the loop state
//! machine and the runner that ties them to the hardware

pub mod controller;
pub mod display;
pub mod policy;
pub mod runner;

pub use controller::{Sample, TickReport, VentChange, VentController};
pub use display::Screen;
pub use policy::{decide_vent_position, VentDecision, VentThresholds};
pub use runner::{warm_up_sensors, SmartVent};
