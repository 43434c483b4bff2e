//! Altitude estimation and flight-event detection.
//!
//! Pressure becomes altitude through the international barometric formula;
//! the estimator then tracks a ground-reference altitude calibrated during
//! Idle and answers the two questions the state machine asks: "have we
//! launched" and "are we back on the ground".

use ringbuffer::{AllocRingBuffer, RingBuffer};

use crate::config::MissionConfig;

/// Standard sea-level pressure (Pa).
pub const SEA_LEVEL_PA: f32 = 101_325.0;

/// Altitude above sea level for a static pressure in hPa.
///
/// International barometric formula, troposphere approximation:
/// `h = 44330 * (1 - (P / P0)^0.1903)`.
pub fn pressure_to_altitude(pressure_hpa: f32) -> f32 {
    let pressure_pa = pressure_hpa * 100.0;
    44330.0 * (1.0 - (pressure_pa / SEA_LEVEL_PA).powf(0.1903))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStatus {
    InProgress,
    Complete,
}

/// Ground-reference tracker. Accumulates a fixed window of altitude samples
/// while the payload sits on the pad, then freezes their mean as the ground
/// reference for the rest of the mission.
pub struct AltitudeEstimator {
    window: AllocRingBuffer<f32>,
    ground_reference: Option<f32>,
    launch_threshold_m: f32,
    landing_threshold_m: f32,
}

impl AltitudeEstimator {
    pub fn new(cfg: &MissionConfig) -> Self {
        AltitudeEstimator {
            window: AllocRingBuffer::new(cfg.calibration_window.max(1)),
            ground_reference: None,
            launch_threshold_m: cfg.launch_threshold_m,
            landing_threshold_m: cfg.landing_threshold_m,
        }
    }

    /// Feed one altitude sample into the calibration window. On the final
    /// sample the window mean becomes the ground reference; once complete,
    /// further calls change nothing.
    pub fn calibrate(&mut self, altitude_m: f32) -> CalibrationStatus {
        if self.ground_reference.is_some() {
            return CalibrationStatus::Complete;
        }

        self.window.push(altitude_m);
        if self.window.len() < self.window.capacity() {
            return CalibrationStatus::InProgress;
        }

        let mean = self.window.iter().sum::<f32>() / self.window.len() as f32;
        self.ground_reference = Some(mean);
        CalibrationStatus::Complete
    }

    pub fn is_calibrated(&self) -> bool {
        self.ground_reference.is_some()
    }

    /// Samples still needed before the ground reference freezes.
    pub fn calibration_remaining(&self) -> usize {
        if self.ground_reference.is_some() {
            0
        } else {
            self.window.capacity() - self.window.len()
        }
    }

    pub fn ground_reference(&self) -> Option<f32> {
        self.ground_reference
    }

    /// Launch detected: altitude exceeds the ground reference by more than
    /// the launch threshold. Always false before calibration completes.
    pub fn is_launch(&self, altitude_m: f32) -> bool {
        match self.ground_reference {
            Some(ground) => altitude_m - ground > self.launch_threshold_m,
            None => false,
        }
    }

    /// Landing detected: altitude back within the landing band around the
    /// ground reference. Only meaningful once the flight is under way; the
    /// state machine guarantees it is evaluated in Collect only.
    pub fn is_landed(&self, altitude_m: f32) -> bool {
        match self.ground_reference {
            Some(ground) => (altitude_m - ground).abs() < self.landing_threshold_m,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn estimator() -> AltitudeEstimator {
        AltitudeEstimator::new(&MissionConfig::default())
    }

    #[test]
    fn sea_level_pressure_is_zero_altitude() {
        assert_relative_eq!(pressure_to_altitude(1013.25), 0.0, epsilon = 1.0);
    }

    #[test]
    fn altitude_decreases_with_pressure() {
        let mut last = pressure_to_altitude(1050.0);
        for p in [1013.25, 950.0, 900.0, 800.0, 700.0] {
            let alt = pressure_to_altitude(p);
            assert!(alt > last, "altitude must grow as pressure drops");
            last = alt;
        }
    }

    #[test]
    fn known_pressure_altitudes() {
        // ~1500 m and ~5500 m on the standard atmosphere.
        assert_relative_eq!(pressure_to_altitude(845.6), 1500.0, epsilon = 10.0);
        assert_relative_eq!(pressure_to_altitude(505.0), 5500.0, epsilon = 40.0);
    }

    #[test]
    fn calibration_completes_exactly_on_nth_sample() {
        let mut est = estimator();

        for _ in 0..4 {
            assert_eq!(est.calibrate(120.0), CalibrationStatus::InProgress);
            assert!(!est.is_calibrated());
        }
        assert_eq!(est.calibrate(120.0), CalibrationStatus::Complete);
        assert!(est.is_calibrated());
        assert_relative_eq!(est.ground_reference().unwrap(), 120.0);
        assert_eq!(est.calibration_remaining(), 0);
    }

    #[test]
    fn calibration_averages_the_window() {
        let mut est = estimator();
        for alt in [100.0, 102.0, 98.0, 101.0, 99.0] {
            est.calibrate(alt);
        }
        assert_relative_eq!(est.ground_reference().unwrap(), 100.0);
    }

    #[test]
    fn calibration_is_never_reentered() {
        let mut est = estimator();
        for _ in 0..5 {
            est.calibrate(100.0);
        }

        // Wildly different samples after completion must not move the
        // ground reference.
        assert_eq!(est.calibrate(5000.0), CalibrationStatus::Complete);
        assert_relative_eq!(est.ground_reference().unwrap(), 100.0);
    }

    #[test]
    fn launch_boundary_sits_at_threshold() {
        let mut est = estimator();
        for _ in 0..5 {
            est.calibrate(100.0);
        }

        let threshold = MissionConfig::default().launch_threshold_m;
        assert!(est.is_launch(100.0 + threshold + 1.0));
        assert!(!est.is_launch(100.0 + threshold - 1.0));
        assert!(!est.is_launch(100.0 + threshold));
    }

    #[test]
    fn no_launch_before_calibration() {
        let est = estimator();
        assert!(!est.is_launch(10_000.0));
    }

    #[test]
    fn landing_band_is_symmetric() {
        let mut est = estimator();
        for _ in 0..5 {
            est.calibrate(100.0);
        }

        assert!(est.is_landed(100.0));
        assert!(est.is_landed(120.0));
        assert!(est.is_landed(80.0));
        assert!(!est.is_landed(200.0));
    }
}
