use std::{env, fs};

use anyhow::Result;
use env_logger::Env;
use log::{info, warn};

use cansat_flight::{
    config::MissionConfig,
    devices::linux::{
        CameraPipeline, CharSensor, GnssReceiver, RadioModem, BARO_DEV, CAMERA_DEV, GNSS_DEV,
        GYRO_DEV, RADIO_DEV, UV_DEV,
    },
    fsm::FlightController,
    link::{CameraControl, RadioLink},
    sensors::SensorHub,
    utils::time::WallClock,
};

const DEFAULT_CONFIG: &str = "config/mission.toml";

fn load_config(path: &str) -> MissionConfig {
    match fs::read_to_string(path) {
        Ok(text) => match MissionConfig::from_toml(&text) {
            Ok(cfg) => {
                info!("mission config loaded from {path}");
                cfg
            }
            Err(e) => {
                warn!("{path}: {e}, flying on defaults");
                MissionConfig::default()
            }
        },
        Err(e) => {
            warn!("cannot read {path}: {e}, flying on defaults");
            MissionConfig::default()
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().filter_or("LOG_LEVEL", "info")).init();

    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.into());
    let cfg = load_config(&config_path);

    let hub = SensorHub::new(
        Box::new(CharSensor::new(BARO_DEV)),
        Box::new(CharSensor::new(GYRO_DEV)),
        Box::new(CharSensor::new(UV_DEV)),
        Box::new(GnssReceiver::new(GNSS_DEV)),
        &cfg,
    );
    let radio = RadioLink::new(Box::new(RadioModem::new(RADIO_DEV)));
    let camera = CameraControl::new(Box::new(CameraPipeline::new(CAMERA_DEV)), &cfg);

    let mut controller = FlightController::new(hub, radio, camera, cfg, Box::new(WallClock::new()));

    info!("flight controller starting");
    controller.run()?;
    Ok(())
}
