use std::{
    ops::{Add, AddAssign, Sub, SubAssign},
    sync::Mutex,
    thread,
};

use chrono::TimeDelta;

/// Time source for the mission loop. All cadence decisions go through this
/// trait so that tests can run an entire flight without real sleeps.
pub trait Clock {
    fn monotonic(&self) -> Instant;
    fn sleep(&self, delta: TimeDelta);
}

/// A point on the monotonic timeline, measured from process start.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct Instant {
    delta: TimeDelta,
}

impl Instant {
    pub fn elapsed(&self) -> TimeDelta {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.delta.num_seconds() as f64 + (self.delta.subsec_nanos() as f64) / 1_000_000_000.0
    }

    pub fn duration_since(&self, other: &Instant) -> TimeDelta {
        self.delta - other.delta
    }
}

impl Add<TimeDelta> for Instant {
    type Output = Instant;

    fn add(self, rhs: TimeDelta) -> Self::Output {
        Instant {
            delta: self.delta + rhs,
        }
    }
}

impl AddAssign<TimeDelta> for Instant {
    fn add_assign(&mut self, rhs: TimeDelta) {
        self.delta += rhs;
    }
}

impl Sub<TimeDelta> for Instant {
    type Output = Instant;
    fn sub(self, rhs: TimeDelta) -> Self::Output {
        Instant {
            delta: self.delta - rhs,
        }
    }
}

impl SubAssign<TimeDelta> for Instant {
    fn sub_assign(&mut self, rhs: TimeDelta) {
        self.delta -= rhs
    }
}

/// Real time: monotonic readings from process start, sleeps on the OS.
#[derive(Debug)]
pub struct WallClock {
    origin: std::time::Instant,
}

impl WallClock {
    pub fn new() -> Self {
        WallClock {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn monotonic(&self) -> Instant {
        Instant {
            delta: TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::MAX),
        }
    }

    fn sleep(&self, delta: TimeDelta) {
        if let Ok(d) = delta.to_std() {
            thread::sleep(d);
        }
    }
}

/// Simulated time: sleeping advances the clock instead of blocking, so a
/// multi-minute mission runs instantly under test.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    elapsed: Mutex<TimeDelta>,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self, delta: TimeDelta) {
        *self.elapsed.lock().unwrap() += delta;
    }
}

impl Clock for SimulatedClock {
    fn monotonic(&self) -> Instant {
        Instant {
            delta: *self.elapsed.lock().unwrap(),
        }
    }

    fn sleep(&self, delta: TimeDelta) {
        self.step(delta);
    }
}
