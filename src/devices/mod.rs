//! Device capability traits.
//!
//! The flight core never touches a bus or a register map: it talks to every
//! piece of hardware through one of these narrow traits and interprets the
//! `io::Error` (errno) that comes back. Real device nodes live in
//! [`linux`]; tests substitute scripted mocks.

use bytes::{Buf, BufMut};
use chrono::TimeDelta;
use std::io;

use crate::telemetry::ImageClass;

pub mod linux;

/// Satellite systems selectable on the GNSS receiver.
pub const SAT_GPS: u32 = 1 << 0;
pub const SAT_GLONASS: u32 = 1 << 1;

/// GNSS receiver configuration applied during boot.
#[derive(Debug, Clone, Copy)]
pub struct GnssSetup {
    /// Position notify cycle (ms).
    pub cycle_ms: u32,
    /// Bitmask of `SAT_*` systems.
    pub systems: u32,
    /// Hot start using retained ephemeris.
    pub hot_start: bool,
}

impl Default for GnssSetup {
    fn default() -> Self {
        GnssSetup {
            cycle_ms: 1000,
            systems: SAT_GPS | SAT_GLONASS,
            hot_start: true,
        }
    }
}

/// A positioning result as the GNSS driver hands it back: validity flag,
/// coordinates and UTC time of the fix.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawFix {
    pub valid: bool,
    pub latitude: f64,
    pub longitude: f64,
    pub hour: u8,
    pub minute: u8,
    pub sec: u8,
    pub usec: u32,
}

impl RawFix {
    /// Serialized length: flags/time header plus two f64 coordinates.
    pub const LEN: usize = 24;

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut out = [0u8; Self::LEN];
        let mut buf = &mut out[..];
        buf.put_u8(self.valid as u8);
        buf.put_u8(self.hour);
        buf.put_u8(self.minute);
        buf.put_u8(self.sec);
        buf.put_u32_le(self.usec);
        buf.put_f64_le(self.latitude);
        buf.put_f64_le(self.longitude);
        out
    }

    pub fn from_bytes(raw: &[u8; Self::LEN]) -> Self {
        let mut buf = &raw[..];
        RawFix {
            valid: buf.get_u8() != 0,
            hour: buf.get_u8(),
            minute: buf.get_u8(),
            sec: buf.get_u8(),
            usec: buf.get_u32_le(),
            latitude: buf.get_f64_le(),
            longitude: buf.get_f64_le(),
        }
    }
}

/// A byte-oriented sensor character device (barometer, gyroscope, UV).
pub trait SensorDevice {
    fn open(&mut self) -> io::Result<()>;

    /// Apply the driver sampling interval and batch latency. Drivers that do
    /// not support the controls keep their defaults and return Ok.
    fn configure(&mut self, interval_us: u32, batch_latency_us: u32) -> io::Result<()>;

    /// Bounded wait for data-ready. `Ok(false)` means the timeout expired.
    /// Sensors without a readiness notification report ready immediately.
    fn poll_ready(&mut self, timeout: TimeDelta) -> io::Result<bool> {
        let _ = timeout;
        Ok(true)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// The GNSS receiver. Fixes arrive via an external readiness notification
/// armed at configure time; reads are only issued once a fix is ready.
pub trait GnssDevice {
    fn open(&mut self) -> io::Result<()>;

    /// Arm the fix-ready notification and start positioning.
    fn configure(&mut self, setup: &GnssSetup) -> io::Result<()>;

    /// Bounded wait for the next fix-ready notification. `Ok(false)` means
    /// the timeout expired; the wait is cancellable only by expiry.
    fn wait_fix_ready(&mut self, timeout: TimeDelta) -> io::Result<bool>;

    fn read_fix(&mut self) -> io::Result<RawFix>;
}

/// The long-range radio, byte-oriented and write-only from the core's side.
pub trait RadioDevice {
    fn open(&mut self) -> io::Result<()>;

    /// Reset the transceiver to a known state.
    fn reset(&mut self) -> io::Result<()>;

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;
}

/// The camera pipeline. Capture and classification mechanics are external;
/// the core only sequences start/shoot/stop and records the returned tag.
pub trait CameraDevice {
    fn open(&mut self) -> io::Result<()>;

    fn start(&mut self) -> io::Result<()>;

    /// Take one frame; the pipeline reports its classification tag.
    fn shoot(&mut self) -> io::Result<ImageClass>;

    fn stop(&mut self) -> io::Result<()>;
}
