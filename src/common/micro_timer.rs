//! interval timer driven by a caller supplied microsecond clock.
//!
//! The engine never reads the wall clock in the analysis path; the host
//! passes `now` into every call so the whole pipeline stays deterministic
//! under test.

pub struct MicroTimer {
    last_time: u128,
    interval: u128,
}

impl MicroTimer {
    pub fn new(now: u128, interval: u128) -> MicroTimer {
        MicroTimer {
            last_time: now,
            interval,
        }
    }
    pub fn set_interval(&mut self, interval: u128) -> () {
        self.interval = interval;
    }
    pub fn get_interval(&self) -> u128 {
        self.interval
    }
    pub fn expired(&self, now: u128) -> bool {
        (self.last_time + self.interval) < now
    }
    pub fn reset(&mut self, now: u128) {
        self.last_time = now;
    }
    pub fn since(&self, now: u128) -> u128 {
        now - self.last_time
    }
}
