//! Frame throttling and debouncing
//!
//! Scroll and mutation ticks must not run more often than the display refreshes,
//! and zoom-triggered renders wait until a burst of scale changes has quieted.
//! Both primitives take the current time from the caller so the host's event loop
//! owns the clock.
//!
//! # Target Frame Times
//! - 120 FPS (ProMotion): 8.33ms per frame
//! - 60 FPS (standard): 16.67ms per frame

use std::time::{Duration, Instant};

/// Frame interval for 60 FPS displays (16.67ms)
pub const FRAME_INTERVAL_60FPS: Duration = Duration::from_micros(16_667);

/// Frame interval for 120 FPS displays (8.33ms)
pub const FRAME_INTERVAL_120FPS: Duration = Duration::from_micros(8_333);

/// Quiet window before a zoom-triggered render fires
pub const DEFAULT_ZOOM_DEBOUNCE: Duration = Duration::from_millis(400);

/// Admits at most one run per frame interval
///
/// # Example
///
/// ```
/// use pdfmask_scheduler::timing::{FrameThrottle, FRAME_INTERVAL_60FPS};
/// use std::time::{Duration, Instant};
///
/// let mut throttle = FrameThrottle::new(FRAME_INTERVAL_60FPS);
/// let start = Instant::now();
///
/// assert!(throttle.try_acquire(start));
/// assert!(!throttle.try_acquire(start + Duration::from_millis(5)));
/// assert!(throttle.try_acquire(start + Duration::from_millis(17)));
/// ```
#[derive(Debug, Clone)]
pub struct FrameThrottle {
    interval: Duration,
    last_run: Option<Instant>,
    skipped: u64,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_run: None, skipped: 0 }
    }

    pub fn for_60fps() -> Self {
        Self::new(FRAME_INTERVAL_60FPS)
    }

    pub fn for_120fps() -> Self {
        Self::new(FRAME_INTERVAL_120FPS)
    }

    /// Claim the current frame. Returns `false` if a run already happened
    /// less than one interval ago.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.skipped += 1;
                false
            }
            _ => {
                self.last_run = Some(now);
                true
            }
        }
    }

    /// Earliest instant at which the next run will be admitted.
    pub fn next_frame_at(&self) -> Option<Instant> {
        self.last_run.map(|last| last + self.interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of runs rejected so far
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn reset(&mut self) {
        self.last_run = None;
    }
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::for_60fps()
    }
}

/// Reports when a burst of triggers has been quiet for a full window
///
/// # Example
///
/// ```
/// use pdfmask_scheduler::timing::Debouncer;
/// use std::time::{Duration, Instant};
///
/// let mut debounce = Debouncer::new(Duration::from_millis(400));
/// let start = Instant::now();
///
/// debounce.trigger(start);
/// debounce.trigger(start + Duration::from_millis(300));
/// assert!(!debounce.is_settled(start + Duration::from_millis(500)));
/// assert!(debounce.is_settled(start + Duration::from_millis(700)));
/// ```
#[derive(Debug, Clone)]
pub struct Debouncer {
    quiet: Duration,
    last_trigger: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, last_trigger: None }
    }

    /// Record a trigger, restarting the quiet window.
    pub fn trigger(&mut self, now: Instant) {
        self.last_trigger = Some(now);
    }

    pub fn is_pending(&self) -> bool {
        self.last_trigger.is_some()
    }

    pub fn is_settled(&self, now: Instant) -> bool {
        self.last_trigger
            .is_some_and(|last| now.saturating_duration_since(last) >= self.quiet)
    }

    /// If settled, clear the pending trigger and return `true`.
    pub fn take_if_settled(&mut self, now: Instant) -> bool {
        if self.is_settled(now) {
            self.last_trigger = None;
            true
        } else {
            false
        }
    }

    /// Instant at which the pending trigger settles.
    pub fn deadline(&self) -> Option<Instant> {
        self.last_trigger.map(|last| last + self.quiet)
    }

    pub fn quiet(&self) -> Duration {
        self.quiet
    }

    pub fn clear(&mut self) {
        self.last_trigger = None;
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn test_throttle_first_run_always_admitted() {
        let mut throttle = FrameThrottle::for_60fps();
        assert!(throttle.next_frame_at().is_none());
        assert!(throttle.try_acquire(Instant::now()));
    }

    #[test]
    fn test_throttle_rejects_within_interval() {
        let mut throttle = FrameThrottle::new(ms(16));
        let start = Instant::now();

        assert!(throttle.try_acquire(start));
        assert!(!throttle.try_acquire(start + ms(1)));
        assert!(!throttle.try_acquire(start + ms(15)));
        assert!(throttle.try_acquire(start + ms(16)));
        assert_eq!(throttle.skipped(), 2);
        assert_eq!(throttle.next_frame_at(), Some(start + ms(32)));
    }

    #[test]
    fn test_throttle_reset() {
        let mut throttle = FrameThrottle::new(ms(16));
        let start = Instant::now();
        assert!(throttle.try_acquire(start));
        throttle.reset();
        assert!(throttle.try_acquire(start + ms(1)));
    }

    #[test]
    fn test_120fps_interval_is_shorter() {
        assert!(FrameThrottle::for_120fps().interval() < FrameThrottle::for_60fps().interval());
    }

    #[test]
    fn test_debouncer_waits_for_quiet_window() {
        let mut debounce = Debouncer::new(ms(400));
        let start = Instant::now();
        assert!(!debounce.is_pending());
        assert!(!debounce.is_settled(start));

        debounce.trigger(start);
        assert_eq!(debounce.deadline(), Some(start + ms(400)));
        assert!(!debounce.take_if_settled(start + ms(399)));
        assert!(debounce.take_if_settled(start + ms(400)));
        assert!(!debounce.is_pending());
    }

    #[test]
    fn test_debouncer_retrigger_extends_window() {
        let mut debounce = Debouncer::new(ms(100));
        let start = Instant::now();

        debounce.trigger(start);
        debounce.trigger(start + ms(80));
        assert!(!debounce.is_settled(start + ms(120)));
        assert!(debounce.is_settled(start + ms(180)));

        debounce.clear();
        assert!(debounce.deadline().is_none());
    }
}
