//! Flight state machine.
//!
//! Four phases, forward-only: Boot opens and configures every device (and is
//! the only place a failure may kill the mission), Idle calibrates the
//! ground reference and watches for launch, Collect runs the telemetry and
//! photo cadences until landing, Recover beacons position forever. One
//! cooperative loop evaluates exactly one phase function per iteration;
//! every blocking call underneath carries its own timeout, so a dead sensor
//! degrades the packet content but never stalls the machine.

use std::fmt;

use chrono::TimeDelta;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    altitude::{pressure_to_altitude, AltitudeEstimator, CalibrationStatus},
    config::MissionConfig,
    link::{CameraControl, RadioLink},
    sensors::{SensorError, SensorHub, SensorKind},
    telemetry::{codec, GnssPosition, ImageClass, OrientationSample, TelemetryPacket},
    utils::time::{Clock, Instant},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightPhase {
    Boot,
    Idle,
    Collect,
    Recover,
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlightPhase::Boot => "boot",
            FlightPhase::Idle => "idle",
            FlightPhase::Collect => "collect",
            FlightPhase::Recover => "recover",
        })
    }
}

/// Boot is atomic: every device failure observed during open/configure is
/// reported together, and any failure at all aborts the mission.
#[derive(Debug, Error)]
#[error("boot aborted: {}", .failures.join("; "))]
pub struct BootError {
    pub failures: Vec<String>,
}

/// Values substituted into the packet when a sensor misses a cycle, so a
/// single outage never suppresses a transmission.
#[derive(Debug, Default)]
pub struct LastKnown {
    pub pressure_hpa: f32,
    pub orientation: OrientationSample,
    pub gnss: GnssPosition,
    pub uv: u8,
    pub class: ImageClass,
}

/// Everything the phase functions operate on: device facades, estimator,
/// cadence deadlines and the last-known-good cache. Owned by the controller
/// and passed explicitly; there is no global state.
pub struct FlightContext {
    pub hub: SensorHub,
    pub radio: RadioLink,
    pub camera: CameraControl,
    pub estimator: AltitudeEstimator,
    pub cfg: MissionConfig,
    pub clock: Box<dyn Clock>,

    pub counter: u32,
    pub last: LastKnown,
    next_telemetry: Option<Instant>,
    next_photo: Option<Instant>,
}

pub struct FlightController {
    ctx: FlightContext,
    phase: FlightPhase,
}

impl FlightController {
    pub fn new(
        hub: SensorHub,
        radio: RadioLink,
        camera: CameraControl,
        cfg: MissionConfig,
        clock: Box<dyn Clock>,
    ) -> Self {
        let estimator = AltitudeEstimator::new(&cfg);
        FlightController {
            ctx: FlightContext {
                hub,
                radio,
                camera,
                estimator,
                cfg,
                clock,
                counter: 0,
                last: LastKnown::default(),
                next_telemetry: None,
                next_photo: None,
            },
            phase: FlightPhase::Boot,
        }
    }

    pub fn phase(&self) -> FlightPhase {
        self.phase
    }

    pub fn context(&self) -> &FlightContext {
        &self.ctx
    }

    /// Run one phase function to completion and apply its transition.
    /// Only Boot can fail; every later phase degrades and carries on.
    pub fn step(&mut self) -> Result<FlightPhase, BootError> {
        let next = match self.phase {
            FlightPhase::Boot => boot(&mut self.ctx)?,
            FlightPhase::Idle => idle(&mut self.ctx),
            FlightPhase::Collect => collect(&mut self.ctx),
            FlightPhase::Recover => recover(&mut self.ctx),
        };

        if next != self.phase {
            info!("flight phase {} -> {}", self.phase, next);
            self.phase = next;
        }

        Ok(self.phase)
    }

    /// The mission loop. Returns only on a Boot failure; once airborne the
    /// machine runs until power dies.
    pub fn run(&mut self) -> Result<(), BootError> {
        loop {
            self.step()?;
        }
    }
}

fn boot(ctx: &mut FlightContext) -> Result<FlightPhase, BootError> {
    let mut failures: Vec<String> = ctx
        .hub
        .open_and_configure()
        .into_iter()
        .map(|e| e.to_string())
        .collect();

    if let Err(e) = ctx.radio.open_and_reset() {
        failures.push(e.to_string());
    }
    if let Err(e) = ctx.camera.open() {
        failures.push(e.to_string());
    }

    if failures.is_empty() {
        info!("all devices up, entering idle");
        Ok(FlightPhase::Idle)
    } else {
        for failure in &failures {
            error!("boot: {failure}");
        }
        Err(BootError { failures })
    }
}

fn idle(ctx: &mut FlightContext) -> FlightPhase {
    let mut next = FlightPhase::Idle;

    if let Some(altitude) = read_altitude(ctx) {
        if !ctx.estimator.is_calibrated() {
            // Launch detection starts on the sample after calibration
            // completes, never on the completing sample itself.
            if ctx.estimator.calibrate(altitude) == CalibrationStatus::Complete {
                info!(
                    "ground reference locked at {:.1} m",
                    ctx.estimator.ground_reference().unwrap_or(f32::NAN)
                );
            }
        } else if ctx.estimator.is_launch(altitude) {
            info!("launch detected at {altitude:.1} m");
            next = FlightPhase::Collect;
        }
    }

    refresh_gnss(ctx);

    if next == FlightPhase::Collect {
        // Both Collect cadences are due immediately on entry.
        let now = ctx.clock.monotonic();
        ctx.next_telemetry = Some(now);
        ctx.next_photo = Some(now);
    } else {
        ctx.clock.sleep(ctx.cfg.idle_period());
    }

    next
}

fn collect(ctx: &mut FlightContext) -> FlightPhase {
    let now = ctx.clock.monotonic();
    let mut fresh_altitude = None;

    if due(ctx.next_telemetry, now) {
        fresh_altitude = read_altitude(ctx);

        match ctx.hub.read(SensorKind::Gyroscope) {
            Ok(sample) => match codec::decode_gyro(&sample.raw) {
                Ok(orientation) => ctx.last.orientation = orientation,
                Err(e) => warn!("gyroscope frame rejected: {e}"),
            },
            Err(_) => {} // logged by the hub, last known sample flies
        }

        if let Ok(sample) = ctx.hub.read(SensorKind::UltravioletLight) {
            ctx.last.uv = sample.raw[0];
        }

        refresh_gnss(ctx);

        let packet = TelemetryPacket::from_readings(
            ctx.last.pressure_hpa,
            &ctx.last.gnss,
            &ctx.last.orientation,
            ctx.last.uv,
            ctx.last.class,
            ctx.counter,
        );
        ctx.counter = ctx.counter.wrapping_add(1);

        if let Err(e) = ctx.radio.transmit(&packet) {
            warn!("transmit failed, mission continues: {e}");
        }

        ctx.next_telemetry = Some(advance(now, ctx.next_telemetry, ctx.cfg.telemetry_period()));
    }

    if due(ctx.next_photo, now) {
        if ctx.camera.has_budget() {
            match ctx.camera.capture() {
                Ok(class) => ctx.last.class = class,
                Err(e) => warn!("photo capture failed: {e}"),
            }
        }
        ctx.next_photo = Some(advance(now, ctx.next_photo, ctx.cfg.photo_period()));
    }

    match fresh_altitude {
        Some(altitude) if ctx.estimator.is_landed(altitude) => {
            info!("landing detected at {altitude:.1} m");
            FlightPhase::Recover
        }
        _ => {
            ctx.clock.sleep(ctx.cfg.collect_period());
            FlightPhase::Collect
        }
    }
}

fn recover(ctx: &mut FlightContext) -> FlightPhase {
    // Position only; on timeout the beacon carries the sentinel so the
    // ground can tell a silent receiver from a stale fix.
    let gnss = match ctx.hub.read_fix() {
        Ok(fix) => codec::decode_gnss(&fix),
        Err(SensorError::Timeout(_)) => GnssPosition::default(),
        Err(e) => {
            warn!("recovery gnss read degraded: {e}");
            GnssPosition::default()
        }
    };
    ctx.last.gnss = gnss;

    let packet = TelemetryPacket::beacon(&gnss, ctx.counter);
    ctx.counter = ctx.counter.wrapping_add(1);

    if let Err(e) = ctx.radio.transmit(&packet) {
        warn!("beacon transmit failed: {e}");
    }

    ctx.clock.sleep(ctx.cfg.recover_period());
    FlightPhase::Recover
}

/// Read the barometer and fold it into the cache, returning the derived
/// altitude. `None` means no fresh sample this cycle.
fn read_altitude(ctx: &mut FlightContext) -> Option<f32> {
    let sample = ctx.hub.read(SensorKind::Barometer).ok()?;

    match codec::decode_baro(&sample.raw) {
        Ok(reading) => {
            ctx.last.pressure_hpa = reading.pressure_hpa;
            Some(pressure_to_altitude(reading.pressure_hpa))
        }
        Err(e) => {
            warn!("barometer frame rejected: {e}");
            None
        }
    }
}

/// Best-effort fix refresh. A timeout keeps the previous position (possibly
/// the sentinel); an invalid fix stores the sentinel explicitly.
fn refresh_gnss(ctx: &mut FlightContext) {
    match ctx.hub.read_fix() {
        Ok(fix) => {
            let pos = codec::decode_gnss(&fix);
            if pos.valid {
                debug!(
                    "fix {} {}",
                    codec::format_dmf(fix.latitude),
                    codec::format_dmf(fix.longitude)
                );
            }
            ctx.last.gnss = pos;
        }
        Err(SensorError::Timeout(_)) => debug!("no fresh fix this cycle"),
        Err(e) => warn!("gnss degraded: {e}"),
    }
}

fn due(deadline: Option<Instant>, now: Instant) -> bool {
    deadline.is_some_and(|d| now >= d)
}

/// Next deadline on a fixed cadence. Catches up past `now` without
/// bursting if the loop fell behind.
fn advance(now: Instant, deadline: Option<Instant>, period: TimeDelta) -> Instant {
    let period = period.max(TimeDelta::milliseconds(1));
    let mut deadline = deadline.unwrap_or(now);
    while deadline <= now {
        deadline += period;
    }
    deadline
}
