//! CanSat flight control core.
//!
//! A single cooperative loop drives the mission through four phases:
//! boot, idle (ground calibration and launch watch), collect (telemetry
//! and photo cadences) and recover (position beacon). Device access goes
//! through trait seams so the whole flight can run against scripted
//! hardware in tests.

pub mod altitude;
pub mod config;
pub mod devices;
pub mod fsm;
pub mod link;
pub mod sensors;
pub mod telemetry;
pub mod utils;
