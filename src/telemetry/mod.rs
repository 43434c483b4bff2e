//! Telemetry codec: raw sensor frames in, semantic readings and the fixed
//! 32-byte radio packet out. Everything here is pure and deterministic.

pub mod codec;
pub mod packet;

pub use codec::{
    decode_baro, decode_gnss, decode_gyro, format_dmf, BaroReading, Dmf, GnssPosition,
    OrientationSample,
};
pub use packet::{ImageClass, TelemetryPacket};
