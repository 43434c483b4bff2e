//! Radio and camera command facades.
//!
//! Thin wrappers over the external drivers: a single-attempt packet
//! transmit (retries would break the telemetry cadence) and an atomic
//! start/shoot/stop photo capture charged against a bounded budget.

use std::io;

use log::{debug, warn};
use thiserror::Error;

use crate::{
    config::MissionConfig,
    devices::{CameraDevice, RadioDevice},
    telemetry::{ImageClass, TelemetryPacket},
};

#[derive(Debug, Error)]
pub enum RadioError {
    #[error("cannot open radio: {0}")]
    Open(#[source] io::Error),

    #[error("radio reset rejected: {0}")]
    Reset(#[source] io::Error),

    #[error("radio write failed: {0}")]
    Write(#[source] io::Error),

    #[error("radio accepted {sent} of {len} bytes")]
    ShortWrite { sent: usize, len: usize },
}

pub struct RadioLink {
    device: Box<dyn RadioDevice>,
}

impl RadioLink {
    pub fn new(device: Box<dyn RadioDevice>) -> Self {
        RadioLink { device }
    }

    pub fn open_and_reset(&mut self) -> Result<(), RadioError> {
        self.device.open().map_err(RadioError::Open)?;
        self.device.reset().map_err(RadioError::Reset)
    }

    /// Fire-and-forget transmit: one write attempt, no retry. The caller
    /// logs and moves on; the packet counter has already advanced, so the
    /// ground station sees the gap.
    pub fn transmit(&mut self, packet: &TelemetryPacket) -> Result<(), RadioError> {
        let bytes = packet.encode();
        let sent = self.device.write(&bytes).map_err(RadioError::Write)?;

        if sent < bytes.len() {
            return Err(RadioError::ShortWrite {
                sent,
                len: bytes.len(),
            });
        }

        debug!("packet {} on air", packet.counter);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("cannot open camera: {0}")]
    Open(#[source] io::Error),

    #[error("capture failed: {0}")]
    Capture(#[source] io::Error),

    #[error("photo budget exhausted")]
    BudgetExhausted,
}

pub struct CameraControl {
    device: Box<dyn CameraDevice>,
    frames_per_trigger: u32,
    budget: u32,
}

impl CameraControl {
    pub fn new(device: Box<dyn CameraDevice>, cfg: &MissionConfig) -> Self {
        CameraControl {
            device,
            frames_per_trigger: cfg.photos_per_trigger,
            budget: cfg.photo_budget,
        }
    }

    pub fn open(&mut self) -> Result<(), CameraError> {
        self.device.open().map_err(CameraError::Open)
    }

    pub fn remaining_budget(&self) -> u32 {
        self.budget
    }

    pub fn has_budget(&self) -> bool {
        self.budget > 0
    }

    /// One capture trigger: start the stream, shoot the configured number of
    /// frames, stop. The whole sequence is one attempt; the budget is only
    /// charged when it succeeds, since a failed attempt produced nothing
    /// worth paying for.
    pub fn capture(&mut self) -> Result<ImageClass, CameraError> {
        if self.budget == 0 {
            return Err(CameraError::BudgetExhausted);
        }

        self.device.start().map_err(CameraError::Capture)?;

        let mut class = ImageClass::Unclassified;
        for _ in 0..self.frames_per_trigger {
            match self.device.shoot() {
                Ok(tag) => class = tag,
                Err(e) => {
                    // Best-effort stream teardown before reporting.
                    if let Err(stop) = self.device.stop() {
                        warn!("camera stop after failed shoot also failed: {stop}");
                    }
                    return Err(CameraError::Capture(e));
                }
            }
        }

        self.device.stop().map_err(CameraError::Capture)?;

        self.budget -= 1;
        debug!("capture complete, {} trigger(s) left", self.budget);
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    struct ScriptedRadio {
        accept: usize,
        sent: Vec<Vec<u8>>,
    }

    impl RadioDevice for ScriptedRadio {
        fn open(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn reset(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.sent.push(bytes.to_vec());
            Ok(self.accept.min(bytes.len()))
        }
    }

    struct ScriptedCamera {
        fail_shoot: bool,
        shots: u32,
    }

    impl CameraDevice for ScriptedCamera {
        fn open(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn start(&mut self) -> io::Result<()> {
            Ok(())
        }

        fn shoot(&mut self) -> io::Result<ImageClass> {
            if self.fail_shoot {
                Err(Error::from(ErrorKind::TimedOut))
            } else {
                self.shots += 1;
                Ok(ImageClass::Ground)
            }
        }

        fn stop(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn packet() -> TelemetryPacket {
        TelemetryPacket::beacon(&Default::default(), 1)
    }

    #[test]
    fn transmit_sends_the_full_wire_record() {
        let mut link = RadioLink::new(Box::new(ScriptedRadio {
            accept: TelemetryPacket::WIRE_LEN,
            sent: vec![],
        }));

        link.transmit(&packet()).unwrap();
    }

    #[test]
    fn short_write_is_an_error() {
        let mut link = RadioLink::new(Box::new(ScriptedRadio {
            accept: 10,
            sent: vec![],
        }));

        assert!(matches!(
            link.transmit(&packet()),
            Err(RadioError::ShortWrite { sent: 10, len: 32 })
        ));
    }

    #[test]
    fn successful_capture_charges_budget() {
        let mut cam = CameraControl::new(
            Box::new(ScriptedCamera {
                fail_shoot: false,
                shots: 0,
            }),
            &MissionConfig::default(),
        );
        let initial = cam.remaining_budget();

        let class = cam.capture().unwrap();
        assert_eq!(class, ImageClass::Ground);
        assert_eq!(cam.remaining_budget(), initial - 1);
    }

    #[test]
    fn failed_capture_leaves_budget_untouched() {
        let mut cam = CameraControl::new(
            Box::new(ScriptedCamera {
                fail_shoot: true,
                shots: 0,
            }),
            &MissionConfig::default(),
        );
        let initial = cam.remaining_budget();

        assert!(matches!(cam.capture(), Err(CameraError::Capture(_))));
        assert_eq!(cam.remaining_budget(), initial);
    }

    #[test]
    fn exhausted_budget_refuses_capture() {
        let cfg = MissionConfig {
            photo_budget: 1,
            ..Default::default()
        };
        let mut cam = CameraControl::new(
            Box::new(ScriptedCamera {
                fail_shoot: false,
                shots: 0,
            }),
            &cfg,
        );

        cam.capture().unwrap();
        assert!(!cam.has_budget());
        assert!(matches!(cam.capture(), Err(CameraError::BudgetExhausted)));
    }
}
