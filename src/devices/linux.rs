//! File-backed device-node implementations used by the flight binary.
//!
//! Driver bodies are out of scope: each type opens its character device and
//! forwards reads/writes, surfacing errno through `io::Error`. The GNSS
//! fix-ready signal is modelled as a ticker thread feeding an mpsc channel
//! at the receiver's configured notify cycle.

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::Duration,
};

use chrono::TimeDelta;
use log::debug;

use crate::telemetry::ImageClass;

use super::{CameraDevice, GnssDevice, GnssSetup, RadioDevice, RawFix, SensorDevice};

pub const BARO_DEV: &str = "/dev/sensor/sensor_baro0";
pub const GYRO_DEV: &str = "/dev/sensor/sensor_gyro0";
pub const UV_DEV: &str = "/dev/sensor/sensor_uv0";
pub const GNSS_DEV: &str = "/dev/gps";
pub const RADIO_DEV: &str = "/dev/radio0";
pub const CAMERA_DEV: &str = "/dev/video0";

/// A read-only sensor character device.
pub struct CharSensor {
    path: String,
    file: Option<File>,
}

impl CharSensor {
    pub fn new(path: &str) -> Self {
        CharSensor {
            path: path.to_string(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "device not open"))
    }
}

impl SensorDevice for CharSensor {
    fn open(&mut self) -> io::Result<()> {
        self.file = Some(OpenOptions::new().read(true).open(&self.path)?);
        Ok(())
    }

    fn configure(&mut self, interval_us: u32, batch_latency_us: u32) -> io::Result<()> {
        // Interval/batch are ioctls on the flight target; the file-backed
        // stand-in keeps the driver defaults.
        self.file()?;
        debug!(
            "{}: interval {} us, batch latency {} us",
            self.path, interval_us, batch_latency_us
        );
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file()?.read(buf)
    }
}

/// GNSS receiver node plus the fix-ready notification channel.
pub struct GnssReceiver {
    path: String,
    file: Option<File>,
    signal: Option<Receiver<()>>,
}

impl GnssReceiver {
    pub fn new(path: &str) -> Self {
        GnssReceiver {
            path: path.to_string(),
            file: None,
            signal: None,
        }
    }
}

impl GnssDevice for GnssReceiver {
    fn open(&mut self) -> io::Result<()> {
        self.file = Some(OpenOptions::new().read(true).open(&self.path)?);
        Ok(())
    }

    fn configure(&mut self, setup: &GnssSetup) -> io::Result<()> {
        if self.file.is_none() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "gnss not open"));
        }

        debug!(
            "{}: systems {:#x}, cycle {} ms, hot start {}",
            self.path, setup.systems, setup.cycle_ms, setup.hot_start
        );

        // Ticker thread stands in for the driver's positioning signal. It
        // dies with the receiver end when this device is dropped.
        let (tx, rx) = mpsc::channel();
        let cycle = Duration::from_millis(setup.cycle_ms as u64);
        thread::spawn(move || loop {
            thread::sleep(cycle);
            if tx.send(()).is_err() {
                break;
            }
        });
        self.signal = Some(rx);

        Ok(())
    }

    fn wait_fix_ready(&mut self, timeout: TimeDelta) -> io::Result<bool> {
        let signal = self
            .signal
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "gnss signal not armed"))?;

        let timeout = timeout.to_std().unwrap_or(Duration::ZERO);
        match signal.recv_timeout(timeout) {
            Ok(()) => Ok(true),
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "gnss signal source gone",
            )),
        }
    }

    fn read_fix(&mut self) -> io::Result<RawFix> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "gnss not open"))?;

        let mut raw = [0u8; RawFix::LEN];
        file.read_exact(&mut raw)?;
        Ok(RawFix::from_bytes(&raw))
    }
}

/// Write-only radio transceiver node.
pub struct RadioModem {
    path: String,
    file: Option<File>,
}

impl RadioModem {
    pub fn new(path: &str) -> Self {
        RadioModem {
            path: path.to_string(),
            file: None,
        }
    }
}

impl RadioDevice for RadioModem {
    fn open(&mut self) -> io::Result<()> {
        self.file = Some(OpenOptions::new().write(true).open(&self.path)?);
        Ok(())
    }

    fn reset(&mut self) -> io::Result<()> {
        if self.file.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "radio not open",
            ));
        }
        debug!("{}: transceiver reset", self.path);
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "radio not open"))?
            .write(bytes)
    }
}

/// Camera pipeline node. Frames are drained and discarded here; storage and
/// classification belong to the capture pipeline, not the flight core.
pub struct CameraPipeline {
    path: String,
    file: Option<File>,
}

impl CameraPipeline {
    pub fn new(path: &str) -> Self {
        CameraPipeline {
            path: path.to_string(),
            file: None,
        }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "camera not open"))
    }
}

impl CameraDevice for CameraPipeline {
    fn open(&mut self) -> io::Result<()> {
        self.file = Some(OpenOptions::new().read(true).open(&self.path)?);
        Ok(())
    }

    fn start(&mut self) -> io::Result<()> {
        self.file()?;
        debug!("{}: capture stream started", self.path);
        Ok(())
    }

    fn shoot(&mut self) -> io::Result<ImageClass> {
        let mut chunk = [0u8; 4096];
        self.file()?.read(&mut chunk)?;
        // Classification happens downstream of the core.
        Ok(ImageClass::Unclassified)
    }

    fn stop(&mut self) -> io::Result<()> {
        self.file()?;
        debug!("{}: capture stream stopped", self.path);
        Ok(())
    }
}
