//! Sensor Access Layer.
//!
//! One hub owns every sensor device handle and offers uniform blocking reads
//! with explicit bounds: the barometer waits on its data-ready poll, the GNSS
//! receiver waits on its fix-ready notification, and neither wait can exceed
//! its timeout. Read failures are logged here and surfaced as typed errors;
//! whether a failure is fatal is the caller's decision.

use std::io;

use chrono::TimeDelta;
use log::warn;

use crate::{
    config::MissionConfig,
    devices::{GnssDevice, GnssSetup, RawFix, SensorDevice, SAT_GLONASS, SAT_GPS},
    telemetry::codec::{BARO_FRAME_LEN, GYRO_FRAME_LEN, UV_FRAME_LEN},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Barometer,
    Gyroscope,
    UltravioletLight,
    GnssFix,
}

impl SensorKind {
    pub fn frame_len(self) -> usize {
        match self {
            SensorKind::Barometer => BARO_FRAME_LEN,
            SensorKind::Gyroscope => GYRO_FRAME_LEN,
            SensorKind::UltravioletLight => UV_FRAME_LEN,
            SensorKind::GnssFix => RawFix::LEN,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Barometer => "barometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::UltravioletLight => "uv",
            SensorKind::GnssFix => "gnss",
        }
    }
}

/// One raw reading from one sensor. Produced by a blocking read, consumed
/// immediately by the codec; never retained across iterations.
#[derive(Debug, Clone)]
pub struct SensorSample {
    pub kind: SensorKind,
    pub raw: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    #[error("cannot open {0}: {1}")]
    Open(&'static str, #[source] io::Error),

    #[error("{0} rejected configuration: {1}")]
    Config(&'static str, #[source] io::Error),

    #[error("{0} read failed: {1}")]
    Read(&'static str, #[source] io::Error),

    #[error("{device} returned {got} bytes, expected {want}")]
    ShortRead {
        device: &'static str,
        got: usize,
        want: usize,
    },

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),
}

pub struct SensorHub {
    baro: Box<dyn SensorDevice>,
    gyro: Box<dyn SensorDevice>,
    uv: Box<dyn SensorDevice>,
    gnss: Box<dyn GnssDevice>,

    baro_interval_us: u32,
    baro_batch_latency_us: u32,
    baro_poll_timeout: TimeDelta,
    gnss_setup: GnssSetup,
    gnss_timeout: TimeDelta,
}

impl SensorHub {
    pub fn new(
        baro: Box<dyn SensorDevice>,
        gyro: Box<dyn SensorDevice>,
        uv: Box<dyn SensorDevice>,
        gnss: Box<dyn GnssDevice>,
        cfg: &MissionConfig,
    ) -> Self {
        SensorHub {
            baro,
            gyro,
            uv,
            gnss,
            baro_interval_us: cfg.baro_interval_us,
            baro_batch_latency_us: cfg.baro_batch_latency_us,
            // Two driver intervals: one full cycle plus slack.
            baro_poll_timeout: TimeDelta::microseconds(2 * cfg.baro_interval_us as i64),
            gnss_setup: GnssSetup {
                cycle_ms: cfg.gnss_cycle_ms,
                systems: SAT_GPS | SAT_GLONASS,
                hot_start: true,
            },
            gnss_timeout: cfg.gnss_timeout(),
        }
    }

    /// Open and configure every sensor device. Failures are collected rather
    /// than short-circuited so Boot can report every broken device at once.
    pub fn open_and_configure(&mut self) -> Vec<SensorError> {
        let mut failures = Vec::new();

        for (name, dev) in [
            ("barometer", &mut self.baro),
            ("gyroscope", &mut self.gyro),
            ("uv", &mut self.uv),
        ] {
            if let Err(e) = dev.open() {
                failures.push(SensorError::Open(name, e));
            }
        }
        if let Err(e) = self.gnss.open() {
            failures.push(SensorError::Open("gnss", e));
        }

        // Configure only what opened; a closed device already failed above.
        if let Err(e) = self
            .baro
            .configure(self.baro_interval_us, self.baro_batch_latency_us)
        {
            failures.push(SensorError::Config("barometer", e));
        }
        if let Err(e) = self.gnss.configure(&self.gnss_setup) {
            failures.push(SensorError::Config("gnss", e));
        }

        failures
    }

    /// Blocking read of one sensor into a fresh fixed-size frame.
    pub fn read(&mut self, kind: SensorKind) -> Result<SensorSample, SensorError> {
        let raw = match kind {
            SensorKind::Barometer => {
                // The barometer produces on a driver interval; wait for
                // data-ready before issuing the read.
                match self.baro.poll_ready(self.baro_poll_timeout) {
                    Ok(true) => {}
                    Ok(false) => {
                        warn!("barometer data-ready poll expired");
                        return Err(SensorError::Timeout("barometer"));
                    }
                    Err(e) => {
                        warn!("barometer poll failed: {e}");
                        return Err(SensorError::Read("barometer", e));
                    }
                }
                Self::read_frame(self.baro.as_mut(), kind)?
            }
            SensorKind::Gyroscope => Self::read_frame(self.gyro.as_mut(), kind)?,
            SensorKind::UltravioletLight => Self::read_frame(self.uv.as_mut(), kind)?,
            SensorKind::GnssFix => self.read_fix()?.to_bytes().to_vec(),
        };

        Ok(SensorSample { kind, raw })
    }

    /// Bounded wait for a fix-ready notification, then read the fix. A
    /// timeout means "no fresh fix this cycle" and is never fatal outside
    /// Boot.
    pub fn read_fix(&mut self) -> Result<RawFix, SensorError> {
        match self.gnss.wait_fix_ready(self.gnss_timeout) {
            Ok(true) => {}
            Ok(false) => return Err(SensorError::Timeout("gnss")),
            Err(e) => {
                warn!("gnss signal wait failed: {e}");
                return Err(SensorError::Read("gnss", e));
            }
        }

        self.gnss.read_fix().map_err(|e| {
            warn!("gnss read failed: {e}");
            SensorError::Read("gnss", e)
        })
    }

    fn read_frame(dev: &mut dyn SensorDevice, kind: SensorKind) -> Result<Vec<u8>, SensorError> {
        let want = kind.frame_len();
        let mut raw = vec![0u8; want];

        let got = dev.read(&mut raw).map_err(|e| {
            warn!("{} read failed: {e}", kind.name());
            SensorError::Read(kind.name(), e)
        })?;

        if got < want {
            warn!("{} short read: {got} of {want} bytes", kind.name());
            return Err(SensorError::ShortRead {
                device: kind.name(),
                got,
                want,
            });
        }

        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    struct ScriptedSensor {
        fail_open: bool,
        frame: Vec<u8>,
        ready: bool,
    }

    impl ScriptedSensor {
        fn ok(frame: Vec<u8>) -> Self {
            ScriptedSensor {
                fail_open: false,
                frame,
                ready: true,
            }
        }
    }

    impl SensorDevice for ScriptedSensor {
        fn open(&mut self) -> io::Result<()> {
            if self.fail_open {
                Err(Error::from(ErrorKind::NotFound))
            } else {
                Ok(())
            }
        }

        fn configure(&mut self, _interval_us: u32, _batch_latency_us: u32) -> io::Result<()> {
            Ok(())
        }

        fn poll_ready(&mut self, _timeout: TimeDelta) -> io::Result<bool> {
            Ok(self.ready)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.frame.len().min(buf.len());
            buf[..n].copy_from_slice(&self.frame[..n]);
            Ok(n)
        }
    }

    struct ScriptedGnss {
        fix: Option<RawFix>,
    }

    impl GnssDevice for ScriptedGnss {
        fn open(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn configure(&mut self, _setup: &GnssSetup) -> io::Result<()> {
            Ok(())
        }

        fn wait_fix_ready(&mut self, _timeout: TimeDelta) -> io::Result<bool> {
            Ok(self.fix.is_some())
        }

        fn read_fix(&mut self) -> io::Result<RawFix> {
            self.fix
                .ok_or_else(|| Error::from(ErrorKind::WouldBlock))
        }
    }

    fn hub(baro: ScriptedSensor, gnss: ScriptedGnss) -> SensorHub {
        SensorHub::new(
            Box::new(baro),
            Box::new(ScriptedSensor::ok(vec![0; GYRO_FRAME_LEN])),
            Box::new(ScriptedSensor::ok(vec![0; UV_FRAME_LEN])),
            Box::new(gnss),
            &MissionConfig::default(),
        )
    }

    #[test]
    fn open_failures_are_aggregated() {
        let mut hub = hub(
            ScriptedSensor {
                fail_open: true,
                frame: vec![],
                ready: true,
            },
            ScriptedGnss { fix: None },
        );

        let failures = hub.open_and_configure();
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], SensorError::Open("barometer", _)));
    }

    #[test]
    fn baro_poll_expiry_is_timeout() {
        let mut hub = hub(
            ScriptedSensor {
                fail_open: false,
                frame: vec![0; BARO_FRAME_LEN],
                ready: false,
            },
            ScriptedGnss { fix: None },
        );

        assert!(matches!(
            hub.read(SensorKind::Barometer),
            Err(SensorError::Timeout("barometer"))
        ));
    }

    #[test]
    fn short_reads_are_rejected() {
        let mut hub = hub(
            ScriptedSensor {
                fail_open: false,
                frame: vec![0; 4],
                ready: true,
            },
            ScriptedGnss { fix: None },
        );

        assert!(matches!(
            hub.read(SensorKind::Barometer),
            Err(SensorError::ShortRead { got: 4, want: 16, .. })
        ));
    }

    #[test]
    fn gnss_silence_is_timeout_not_error() {
        let mut hub = hub(
            ScriptedSensor::ok(vec![0; BARO_FRAME_LEN]),
            ScriptedGnss { fix: None },
        );

        assert!(matches!(hub.read_fix(), Err(SensorError::Timeout("gnss"))));
    }

    #[test]
    fn fix_flows_through_byte_contract_too() {
        let fix = RawFix {
            valid: true,
            latitude: 1.5,
            longitude: 2.5,
            ..Default::default()
        };
        let mut hub = hub(
            ScriptedSensor::ok(vec![0; BARO_FRAME_LEN]),
            ScriptedGnss { fix: Some(fix) },
        );

        let sample = hub.read(SensorKind::GnssFix).unwrap();
        assert_eq!(sample.raw.len(), RawFix::LEN);
        assert_eq!(RawFix::from_bytes(&sample.raw.try_into().unwrap()), fix);
    }
}
