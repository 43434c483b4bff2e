use bytes::BufMut;

use super::codec::{GnssPosition, OrientationSample};

/// Classification tag carried in every packet. `Beacon` marks the
/// post-landing packets that carry no sensor payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ImageClass {
    #[default]
    None = 0,
    Unclassified = 1,
    Ground = 2,
    Sky = 3,
    Beacon = 4,
}

/// The radio wire record. Fixed layout, little-endian, packed; the ground
/// station decodes these bytes bit-for-bit, so the layout never changes
/// across mission phases.
///
/// Wire order: pressure f32, latitude f32, longitude f32, accel 3x i16,
/// temp i16, gyro 3x i16, uv u8, class u8, counter u32 = 32 bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryPacket {
    pub pressure_hpa: f32,
    pub latitude: f32,
    pub longitude: f32,
    pub accel: [i16; 3],
    pub temp: i16,
    pub gyro: [i16; 3],
    pub uv: u8,
    pub class: ImageClass,
    pub counter: u32,
}

impl TelemetryPacket {
    pub const WIRE_LEN: usize = 32;

    /// Assemble a full-sensor packet for the Collect phase.
    pub fn from_readings(
        pressure_hpa: f32,
        gnss: &GnssPosition,
        orientation: &OrientationSample,
        uv: u8,
        class: ImageClass,
        counter: u32,
    ) -> Self {
        TelemetryPacket {
            pressure_hpa,
            latitude: gnss.latitude,
            longitude: gnss.longitude,
            accel: orientation.raw_accel,
            temp: orientation.raw_temp,
            gyro: orientation.raw_gyro,
            uv,
            class,
            counter,
        }
    }

    /// Post-landing beacon: sensor fields zeroed, position and counter kept.
    pub fn beacon(gnss: &GnssPosition, counter: u32) -> Self {
        TelemetryPacket {
            pressure_hpa: 0.0,
            latitude: gnss.latitude,
            longitude: gnss.longitude,
            accel: [0; 3],
            temp: 0,
            gyro: [0; 3],
            uv: 0,
            class: ImageClass::Beacon,
            counter,
        }
    }

    pub fn encode(&self) -> [u8; Self::WIRE_LEN] {
        let mut out = [0u8; Self::WIRE_LEN];
        let mut buf = &mut out[..];

        buf.put_f32_le(self.pressure_hpa);
        buf.put_f32_le(self.latitude);
        buf.put_f32_le(self.longitude);
        for v in self.accel {
            buf.put_i16_le(v);
        }
        buf.put_i16_le(self.temp);
        for v in self.gyro {
            buf.put_i16_le(v);
        }
        buf.put_u8(self.uv);
        buf.put_u8(self.class as u8);
        buf.put_u32_le(self.counter);

        out
    }
}
