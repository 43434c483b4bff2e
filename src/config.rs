use chrono::TimeDelta;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid mission config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Mission parameters loaded from `config/mission.toml`.
///
/// Every field has a flight-proven default, so a missing or partial config
/// file never keeps the payload on the ground. Thresholds are configuration
/// rather than code because they change per launch campaign.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Altitude above ground reference that declares launch (m).
    pub launch_threshold_m: f32,
    /// Altitude band around ground reference that declares landing (m).
    pub landing_threshold_m: f32,
    /// Number of Idle barometer samples averaged into the ground reference.
    pub calibration_window: usize,

    /// Bounded wait for a GNSS fix-ready notification (ms).
    pub gnss_timeout_ms: u64,
    /// GNSS position notify cycle requested from the receiver (ms).
    pub gnss_cycle_ms: u32,
    /// Barometer driver sampling interval (us).
    pub baro_interval_us: u32,
    /// Barometer driver batch latency (us).
    pub baro_batch_latency_us: u32,

    /// Collect: period between telemetry packets (ms).
    pub telemetry_period_ms: u64,
    /// Collect: period between photo-capture triggers (ms).
    pub photo_period_ms: u64,
    /// Frames taken per capture trigger.
    pub photos_per_trigger: u32,
    /// Total capture triggers available for the mission.
    pub photo_budget: u32,

    /// Idle loop delay (ms).
    pub idle_period_ms: u64,
    /// Collect loop delay (ms), shorter than both Collect cadences.
    pub collect_period_ms: u64,
    /// Recover beacon delay (ms).
    pub recover_period_ms: u64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        MissionConfig {
            launch_threshold_m: 400.0,
            landing_threshold_m: 30.0,
            calibration_window: 5,

            gnss_timeout_ms: 3000,
            gnss_cycle_ms: 1000,
            baro_interval_us: 1_000_000,
            baro_batch_latency_us: 0,

            telemetry_period_ms: 1000,
            photo_period_ms: 10_000,
            photos_per_trigger: 3,
            photo_budget: 30,

            idle_period_ms: 1000,
            collect_period_ms: 100,
            recover_period_ms: 10_000,
        }
    }
}

impl MissionConfig {
    pub fn from_toml(text: &str) -> Result<Self, Error> {
        Ok(toml::from_str(text)?)
    }

    pub fn gnss_timeout(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.gnss_timeout_ms as i64)
    }

    pub fn telemetry_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.telemetry_period_ms as i64)
    }

    pub fn photo_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.photo_period_ms as i64)
    }

    pub fn idle_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.idle_period_ms as i64)
    }

    pub fn collect_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.collect_period_ms as i64)
    }

    pub fn recover_period(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.recover_period_ms as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_complete() {
        let cfg = MissionConfig::default();

        assert_eq!(cfg.launch_threshold_m, 400.0);
        assert_eq!(cfg.calibration_window, 5);
        assert_eq!(cfg.gnss_timeout(), TimeDelta::seconds(3));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = MissionConfig::from_toml(
            r#"
            launch_threshold_m = 300.0
            calibration_window = 10
            "#,
        )
        .unwrap();

        assert_eq!(cfg.launch_threshold_m, 300.0);
        assert_eq!(cfg.calibration_window, 10);
        // untouched keys keep their defaults
        assert_eq!(cfg.landing_threshold_m, 30.0);
        assert_eq!(cfg.photo_budget, 30);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(MissionConfig::from_toml("launch_threshold_m = \"high\"").is_err());
    }
}
