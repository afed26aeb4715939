//! Frame throttling and sequencing for continuous delivery.
//!
//! The [`Throttle`] decides which extracted frames reach continuous
//! subscribers. A frame arriving sooner than `interval` after the last
//! delivered one is withheld; delivered frames get a sequence number
//! starting at 1. Withheld frames can still satisfy one-shot captures,
//! that decision belongs to the session.
//!
//! # Configuration
//!
//! - `interval`: minimum spacing between delivered frames (default: 0, every frame)
//! - `max_frames`: stop after this many delivered frames (default: 0, unlimited)

use std::time::Duration;

use tokio::time::Instant;

/// Rate limiter and sequence counter for delivered frames.
#[derive(Debug, Clone)]
pub struct Throttle {
    /// Minimum spacing between delivered frames.
    interval: Duration,
    /// Delivered-frame cutoff (0 = unlimited).
    max_frames: u64,
    /// Sequence number of the last delivered frame (0 = none yet).
    sequence: u64,
    /// When the last frame was delivered.
    last_delivery: Option<Instant>,
}

impl Throttle {
    /// Create a new throttle.
    pub fn new(interval: Duration, max_frames: u64) -> Self {
        Self {
            interval,
            max_frames,
            sequence: 0,
            last_delivery: None,
        }
    }

    /// Decide whether a frame extracted at `now` is delivered.
    ///
    /// Returns the assigned sequence number, or `None` if the frame is
    /// throttled. A throttled frame leaves the sequence and the last
    /// delivery time untouched.
    pub fn admit(&mut self, now: Instant) -> Option<u64> {
        if let Some(last) = self.last_delivery {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }

        self.last_delivery = Some(now);
        self.sequence += 1;
        Some(self.sequence)
    }

    /// Check if the configured frame budget is used up.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.max_frames > 0 && self.sequence >= self.max_frames
    }

    /// Sequence number of the last delivered frame.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// When the last frame was delivered.
    #[inline]
    pub fn last_delivery(&self) -> Option<Instant> {
        self.last_delivery
    }

    /// Configured interval.
    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Configured frame budget (0 = unlimited).
    #[inline]
    pub fn max_frames(&self) -> u64 {
        self.max_frames
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::ZERO, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_interval_admits_everything() {
        let mut throttle = Throttle::default();
        let now = Instant::now();

        assert_eq!(throttle.admit(now), Some(1));
        assert_eq!(throttle.admit(now), Some(2));
        assert_eq!(throttle.admit(now), Some(3));
        assert!(!throttle.is_exhausted());
    }

    #[test]
    fn test_interval_withholds_early_frames() {
        let mut throttle = Throttle::new(Duration::from_millis(100), 0);
        let t0 = Instant::now();

        assert_eq!(throttle.admit(t0), Some(1));
        assert_eq!(throttle.admit(t0 + Duration::from_millis(50)), None);
        assert_eq!(throttle.admit(t0 + Duration::from_millis(99)), None);

        // Withheld frames do not move the reference point
        assert_eq!(throttle.last_delivery(), Some(t0));
        assert_eq!(throttle.sequence(), 1);

        assert_eq!(throttle.admit(t0 + Duration::from_millis(100)), Some(2));
        assert_eq!(throttle.admit(t0 + Duration::from_millis(150)), None);
        assert_eq!(throttle.admit(t0 + Duration::from_millis(250)), Some(3));
    }

    #[test]
    fn test_first_frame_always_admitted() {
        let mut throttle = Throttle::new(Duration::from_secs(3600), 0);
        assert_eq!(throttle.admit(Instant::now()), Some(1));
    }

    #[test]
    fn test_max_frames() {
        let mut throttle = Throttle::new(Duration::ZERO, 2);
        let now = Instant::now();

        throttle.admit(now);
        assert!(!throttle.is_exhausted());

        throttle.admit(now);
        assert!(throttle.is_exhausted());
        assert_eq!(throttle.max_frames(), 2);
    }

    #[test]
    fn test_unlimited_never_exhausts() {
        let mut throttle = Throttle::new(Duration::ZERO, 0);
        let now = Instant::now();

        for _ in 0..1000 {
            throttle.admit(now);
        }
        assert!(!throttle.is_exhausted());
        assert_eq!(throttle.sequence(), 1000);
    }
}
