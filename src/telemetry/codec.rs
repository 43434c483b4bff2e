use bytes::Buf;
use nalgebra::Vector3;
use thiserror::Error;

use crate::devices::RawFix;

/// MPU6050 accelerometer counts per g at the +/-8 g full-scale range the
/// driver configures.
pub const ACCEL_COUNTS_PER_G: f32 = 4096.0;

/// MPU6050 gyroscope counts per deg/s at the +/-1000 deg/s full-scale range.
pub const GYRO_COUNTS_PER_DPS: f32 = 32.8;

/// Coordinate reported when the receiver has no fix. Outside the valid
/// latitude/longitude domain, so the ground station can tell a stale fix
/// from any real position.
pub const GNSS_ERROR_COORD: f32 = 102.0;

/// Barometer frame: u64 timestamp + f32 pressure + f32 temperature.
pub const BARO_FRAME_LEN: usize = 16;

/// Gyroscope frame: 3x i16 accel, i16 temp, 3x i16 angular rate.
pub const GYRO_FRAME_LEN: usize = 14;

/// UV frame: two counter bytes, only the first is telemetered.
pub const UV_FRAME_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("{kind} frame is {got} bytes, expected {want}")]
    FrameLength {
        kind: &'static str,
        got: usize,
        want: usize,
    },
}

/// Decoded barometer reading, straight from the driver's packed struct.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaroReading {
    /// Driver timestamp (us).
    pub timestamp_us: u64,
    pub pressure_hpa: f32,
    pub temperature_c: f32,
}

/// Decode the barometer's little-endian packed struct.
pub fn decode_baro(raw: &[u8]) -> Result<BaroReading, Error> {
    if raw.len() != BARO_FRAME_LEN {
        return Err(Error::FrameLength {
            kind: "barometer",
            got: raw.len(),
            want: BARO_FRAME_LEN,
        });
    }

    let mut buf = raw;
    Ok(BaroReading {
        timestamp_us: buf.get_u64_le(),
        pressure_hpa: buf.get_f32_le(),
        temperature_c: buf.get_f32_le(),
    })
}

/// Decoded inertial sample. The raw counts are kept alongside the scaled
/// values because the radio packet carries counts, not floats.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OrientationSample {
    pub raw_accel: [i16; 3],
    pub raw_temp: i16,
    pub raw_gyro: [i16; 3],

    /// Acceleration (g).
    pub accel_g: Vector3<f32>,
    /// Die temperature (degrees C).
    pub temperature_c: f32,
    /// Angular rate (deg/s).
    pub rate_dps: Vector3<f32>,
}

/// Decode an MPU6050 burst read. Registers are big-endian; scale constants
/// match the full-scale ranges the driver configures.
pub fn decode_gyro(raw: &[u8]) -> Result<OrientationSample, Error> {
    if raw.len() != GYRO_FRAME_LEN {
        return Err(Error::FrameLength {
            kind: "gyroscope",
            got: raw.len(),
            want: GYRO_FRAME_LEN,
        });
    }

    let mut buf = raw;
    let raw_accel = [buf.get_i16(), buf.get_i16(), buf.get_i16()];
    let raw_temp = buf.get_i16();
    let raw_gyro = [buf.get_i16(), buf.get_i16(), buf.get_i16()];

    Ok(OrientationSample {
        raw_accel,
        raw_temp,
        raw_gyro,
        accel_g: Vector3::new(
            raw_accel[0] as f32 / ACCEL_COUNTS_PER_G,
            raw_accel[1] as f32 / ACCEL_COUNTS_PER_G,
            raw_accel[2] as f32 / ACCEL_COUNTS_PER_G,
        ),
        temperature_c: raw_temp as f32 / 340.0 + 36.53,
        rate_dps: Vector3::new(
            raw_gyro[0] as f32 / GYRO_COUNTS_PER_DPS,
            raw_gyro[1] as f32 / GYRO_COUNTS_PER_DPS,
            raw_gyro[2] as f32 / GYRO_COUNTS_PER_DPS,
        ),
    })
}

/// Decoded GNSS position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GnssPosition {
    pub latitude: f32,
    pub longitude: f32,
    pub valid: bool,
}

impl Default for GnssPosition {
    /// "No fix yet": both coordinates at the sentinel, invalid.
    fn default() -> Self {
        GnssPosition {
            latitude: GNSS_ERROR_COORD,
            longitude: GNSS_ERROR_COORD,
            valid: false,
        }
    }
}

/// Decode a driver fix. An invalid fix maps to the sentinel coordinates so
/// downstream consumers never mistake it for a position.
pub fn decode_gnss(fix: &RawFix) -> GnssPosition {
    if fix.valid {
        GnssPosition {
            latitude: fix.latitude as f32,
            longitude: fix.longitude as f32,
            valid: true,
        }
    } else {
        GnssPosition::default()
    }
}

/// A coordinate in degree/minute/fraction form, for operator-readable logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dmf {
    pub negative: bool,
    pub degree: u8,
    pub minute: u8,
    pub frac: u32,
}

/// Convert a decimal-degree coordinate to degree-minute-frac format.
pub fn format_dmf(x: f64) -> Dmf {
    let negative = x < 0.0;
    let x = x.abs();

    let degree = x as u32;
    let t = (x - degree as f64) * 60.0;
    let minute = t as u32;
    let frac = ((t - minute as f64) * 10000.0) as u32;

    Dmf {
        negative,
        degree: degree as u8,
        minute: minute as u8,
        frac,
    }
}

impl std::fmt::Display for Dmf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}.{}.{:04}",
            if self.negative { "-" } else { "" },
            self.degree,
            self.minute,
            self.frac
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use bytes::BufMut;

    fn baro_frame(timestamp_us: u64, pressure_hpa: f32, temperature_c: f32) -> Vec<u8> {
        let mut raw = Vec::with_capacity(BARO_FRAME_LEN);
        raw.put_u64_le(timestamp_us);
        raw.put_f32_le(pressure_hpa);
        raw.put_f32_le(temperature_c);
        raw
    }

    fn gyro_frame(accel: [i16; 3], temp: i16, gyro: [i16; 3]) -> Vec<u8> {
        let mut raw = Vec::with_capacity(GYRO_FRAME_LEN);
        for v in accel {
            raw.put_i16(v);
        }
        raw.put_i16(temp);
        for v in gyro {
            raw.put_i16(v);
        }
        raw
    }

    #[test]
    fn baro_frame_decodes_driver_struct() {
        let reading = decode_baro(&baro_frame(1_234_567, 1013.25, 21.5)).unwrap();

        assert_eq!(reading.timestamp_us, 1_234_567);
        assert_relative_eq!(reading.pressure_hpa, 1013.25);
        assert_relative_eq!(reading.temperature_c, 21.5);
    }

    #[test]
    fn baro_frame_length_checked() {
        assert!(matches!(
            decode_baro(&[0u8; 8]),
            Err(Error::FrameLength { got: 8, .. })
        ));
    }

    #[test]
    fn gyro_decode_applies_scale_constants() {
        // One g on x, half-scale rate on z, zero temperature counts.
        let sample = decode_gyro(&gyro_frame([4096, 0, -4096], 0, [0, 0, 16400])).unwrap();

        assert_eq!(sample.raw_accel, [4096, 0, -4096]);
        assert_relative_eq!(sample.accel_g.x, 1.0);
        assert_relative_eq!(sample.accel_g.z, -1.0);
        assert_relative_eq!(sample.rate_dps.z, 500.0, epsilon = 0.01);
        // raw temp 0 sits at the MPU6050 offset
        assert_relative_eq!(sample.temperature_c, 36.53);
    }

    #[test]
    fn gyro_words_are_big_endian() {
        let mut raw = vec![0u8; GYRO_FRAME_LEN];
        raw[0] = 0x01;
        raw[1] = 0x02;

        let sample = decode_gyro(&raw).unwrap();
        assert_eq!(sample.raw_accel[0], 0x0102);
    }

    #[test]
    fn invalid_fix_becomes_sentinel() {
        let fix = RawFix {
            valid: false,
            latitude: 45.0,
            longitude: 7.6,
            ..Default::default()
        };

        let pos = decode_gnss(&fix);
        assert_eq!(pos.latitude, GNSS_ERROR_COORD);
        assert_eq!(pos.longitude, GNSS_ERROR_COORD);
        assert!(!pos.valid);
    }

    #[test]
    fn valid_fix_keeps_coordinates() {
        let fix = RawFix {
            valid: true,
            latitude: 45.0641,
            longitude: 7.6609,
            ..Default::default()
        };

        let pos = decode_gnss(&fix);
        assert!(pos.valid);
        assert_relative_eq!(pos.latitude, 45.0641, epsilon = 1e-4);
        assert_relative_eq!(pos.longitude, 7.6609, epsilon = 1e-4);
    }

    #[test]
    fn dmf_conversion_matches_reference() {
        let dmf = format_dmf(45.50625);
        assert!(!dmf.negative);
        assert_eq!(dmf.degree, 45);
        assert_eq!(dmf.minute, 30);
        assert_eq!(dmf.frac, 3750);

        let neg = format_dmf(-7.25);
        assert!(neg.negative);
        assert_eq!(neg.degree, 7);
        assert_eq!(neg.minute, 15);
        assert_eq!(neg.frac, 0);

        assert_eq!(neg.to_string(), "-7.15.0000");
    }
}
