//! High-resolution timer for frame timing.

use std::time::{Duration, Instant};

/// High-resolution frame timer with pause support.
///
/// While stopped, `tick()` reports a zero delta and `elapsed()` is frozen;
/// time spent stopped is excluded from the total once the timer restarts.
#[derive(Debug)]
pub struct Timer {
    start: Instant,
    last_tick: Instant,
    paused: Duration,
    stopped_at: Option<Instant>,
}

impl Timer {
    /// Create a new timer, starting from now.
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_tick: now,
            paused: Duration::ZERO,
            stopped_at: None,
        }
    }

    /// Get the total running time since the timer was created,
    /// excluding any stopped periods.
    pub fn elapsed(&self) -> Duration {
        let end = self.stopped_at.unwrap_or_else(Instant::now);
        (end - self.start).saturating_sub(self.paused)
    }

    /// Get the total running time in seconds.
    pub fn elapsed_secs(&self) -> f32 {
        self.elapsed().as_secs_f32()
    }

    /// Get the time elapsed since the last call to `tick()`.
    /// This is the delta time for a frame loop; zero while stopped.
    pub fn tick(&mut self) -> Duration {
        if self.stopped_at.is_some() {
            return Duration::ZERO;
        }
        let now = Instant::now();
        let delta = now - self.last_tick;
        self.last_tick = now;
        delta
    }

    /// Get the delta time in seconds since the last tick.
    pub fn delta_secs(&mut self) -> f32 {
        self.tick().as_secs_f32()
    }

    /// Stop the timer. No-op if already stopped.
    pub fn stop(&mut self) {
        if self.stopped_at.is_none() {
            self.stopped_at = Some(Instant::now());
        }
    }

    /// Restart a stopped timer, accumulating the stopped period as paused
    /// time. No-op if the timer is running.
    pub fn start(&mut self) {
        if let Some(stopped_at) = self.stopped_at.take() {
            let now = Instant::now();
            self.paused += now - stopped_at;
            self.last_tick = now;
        }
    }

    /// Returns true while the timer is stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Reset the timer to the current time, clearing paused state.
    pub fn reset(&mut self) {
        let now = Instant::now();
        self.start = now;
        self.last_tick = now;
        self.paused = Duration::ZERO;
        self.stopped_at = None;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_new_timer_is_running() {
        let mut timer = Timer::new();
        assert!(!timer.is_stopped());
        assert!(timer.tick() >= Duration::ZERO);
    }

    #[test]
    fn test_tick_advances() {
        let mut timer = Timer::new();
        timer.tick();
        sleep(Duration::from_millis(5));
        let delta = timer.tick();
        assert!(delta > Duration::ZERO);
    }

    #[test]
    fn test_stopped_timer_reports_zero_delta() {
        let mut timer = Timer::new();
        timer.stop();
        sleep(Duration::from_millis(5));
        assert_eq!(timer.tick(), Duration::ZERO);
    }

    #[test]
    fn test_elapsed_frozen_while_stopped() {
        let mut timer = Timer::new();
        timer.stop();
        let first = timer.elapsed();
        sleep(Duration::from_millis(10));
        let second = timer.elapsed();
        assert_eq!(first, second);
    }

    #[test]
    fn test_paused_time_excluded_from_elapsed() {
        let created = Instant::now();
        let mut timer = Timer::new();
        sleep(Duration::from_millis(5));
        timer.stop();
        sleep(Duration::from_millis(30));
        timer.start();
        let wall = created.elapsed();
        assert!(timer.elapsed() < wall);
    }

    #[test]
    fn test_restart_does_not_inflate_delta() {
        let mut timer = Timer::new();
        timer.tick();
        timer.stop();
        sleep(Duration::from_millis(50));
        timer.start();
        let delta = timer.tick();
        assert!(delta < Duration::from_millis(40));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut timer = Timer::new();
        timer.stop();
        let first = timer.elapsed();
        timer.stop();
        assert_eq!(timer.elapsed(), first);
    }

    #[test]
    fn test_reset_clears_stopped_state() {
        let mut timer = Timer::new();
        timer.stop();
        timer.reset();
        assert!(!timer.is_stopped());
    }
}
