//! Clocks and interval timers injected into the session.
//!
//! The session never reads wall time directly. Hosts pass a
//! [`MonotonicClock`]; tests pass a [`VirtualClock`] and advance it by hand.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A millisecond time source.
pub trait SystemClock {
    fn now_ms(&self) -> f64;
}

/// Wall clock backed by [`Instant`], zeroed at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    now: Rc<Cell<f64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl SystemClock for VirtualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// A repeating timer the owner polls.
pub trait Timer {
    /// Starts (or restarts) firing every `interval_ms`, from now.
    fn arm(&mut self, interval_ms: f64);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
    /// Number of intervals elapsed since the last poll. 0 when disarmed.
    fn poll(&mut self) -> u32;
}

/// [`Timer`] over any [`SystemClock`].
pub struct ClockTimer<C: SystemClock> {
    clock: C,
    interval_ms: f64,
    next_fire: Option<f64>,
}

impl<C: SystemClock> ClockTimer<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            interval_ms: 0.0,
            next_fire: None,
        }
    }
}

impl<C: SystemClock> Timer for ClockTimer<C> {
    fn arm(&mut self, interval_ms: f64) {
        self.interval_ms = interval_ms.max(1.0);
        self.next_fire = Some(self.clock.now_ms() + self.interval_ms);
    }

    fn disarm(&mut self) {
        self.next_fire = None;
    }

    fn is_armed(&self) -> bool {
        self.next_fire.is_some()
    }

    fn poll(&mut self) -> u32 {
        let Some(mut next) = self.next_fire else {
            return 0;
        };
        let now = self.clock.now_ms();
        let mut fired = 0;
        while now >= next {
            fired += 1;
            next += self.interval_ms;
        }
        self.next_fire = Some(next);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_clock_clones_share_time() {
        let clock = VirtualClock::new();
        let handle = clock.clone();
        handle.advance(250.0);
        assert_eq!(clock.now_ms(), 250.0);
    }

    #[test]
    fn timer_counts_elapsed_intervals() {
        let clock = VirtualClock::new();
        let mut timer = ClockTimer::new(clock.clone());
        timer.arm(1000.0);

        clock.advance(999.0);
        assert_eq!(timer.poll(), 0);
        clock.advance(1.0);
        assert_eq!(timer.poll(), 1);
        clock.advance(2500.0);
        assert_eq!(timer.poll(), 2);
    }

    #[test]
    fn disarmed_timer_never_fires() {
        let clock = VirtualClock::new();
        let mut timer = ClockTimer::new(clock.clone());
        timer.arm(100.0);
        timer.disarm();
        clock.advance(1000.0);
        assert_eq!(timer.poll(), 0);
        assert!(!timer.is_armed());
    }
}
