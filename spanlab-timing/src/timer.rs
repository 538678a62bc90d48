use chrono::{DateTime, TimeDelta, Utc};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Clock used to drive presentation timing.
///
/// `now_ms` is monotonic and relative to the timer's creation. `utc_now` is
/// only used to stamp trial records.
pub trait Timer: Clone {
    fn now_ms(&self) -> u64;
    fn utc_now(&self) -> DateTime<Utc>;
    fn sleep(&self, d: Duration);

    fn elapsed_since(&self, ts_ms: u64) -> Duration {
        Duration::from_millis(self.now_ms().saturating_sub(ts_ms))
    }

    /// Block until the monotonic clock reads at least `deadline_ms`.
    fn sleep_until(&self, deadline_ms: u64) {
        let now = self.now_ms();
        if deadline_ms > now {
            self.sleep(Duration::from_millis(deadline_ms - now));
        }
    }
}

#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub start_utc: DateTime<Utc>,
}

impl Timer for HighPrecisionTimer {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Wall-clock time on the monotonic clock's timeline.
    fn utc_now(&self) -> DateTime<Utc> {
        self.start_utc + TimeDelta::milliseconds(self.now_ms() as i64)
    }

    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_utc: Utc::now(),
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        #[cfg(target_os = "linux")]
        self.linux_sleep(duration);
        #[cfg(not(target_os = "linux"))]
        std::thread::sleep(duration);
    }

    #[cfg(target_os = "linux")]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        // SAFETY: `req` is a valid timespec and the remainder pointer may be null.
        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hand-driven clock. Clones share the same time, and `sleep` advances it
/// instantly, so a whole session can be replayed without waiting.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    now: Rc<Cell<u64>>,
    epoch: DateTime<Utc>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::starting_at(DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn starting_at(epoch: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            epoch,
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    /// Moves the clock forward to `ms`; never moves it backwards.
    pub fn set(&self, ms: u64) {
        self.now.set(self.now.get().max(ms));
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        self.epoch + TimeDelta::milliseconds(self.now.get() as i64)
    }

    fn sleep(&self, d: Duration) {
        self.advance(d.as_millis() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_timer_clones_share_time() {
        let timer = ManualTimer::new();
        let other = timer.clone();
        timer.advance(250);
        other.sleep(Duration::from_millis(50));
        assert_eq!(timer.now_ms(), 300);
        assert_eq!(timer.elapsed_since(100), Duration::from_millis(200));
    }

    #[test]
    fn manual_timer_never_rewinds() {
        let timer = ManualTimer::new();
        timer.set(1_000);
        timer.set(400);
        assert_eq!(timer.now_ms(), 1_000);
    }

    #[test]
    fn manual_utc_follows_clock() {
        let timer = ManualTimer::new();
        timer.sleep_until(1_500);
        assert_eq!(
            timer.utc_now(),
            DateTime::<Utc>::UNIX_EPOCH + TimeDelta::milliseconds(1_500)
        );
    }

    #[test]
    fn high_precision_sleep_waits() {
        let timer = HighPrecisionTimer::new();
        let before = timer.now_ms();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.now_ms() >= before + 4);
    }

    #[test]
    fn high_precision_utc_tracks_monotonic_clock() {
        let timer = HighPrecisionTimer::new();
        timer.sleep(Duration::from_millis(20));
        let stamped = timer.utc_now();
        let offset = (stamped - timer.start_utc).num_milliseconds();
        assert!(offset >= 20);
        assert!(offset as u64 <= timer.now_ms());
    }
}
