//! Fixed-interval frame scheduling and FPS measurement.

use std::time::{Duration, Instant};

/// Decides when the next frame is due and measures the achieved rate
#[derive(Debug, Clone)]
pub struct FrameClock {
    interval: Duration,
    start: Instant,
    next_due: Instant,
    window_start: Instant,
    window_frames: u32,
    fps: f32,
}

/// FPS is recomputed once per window
const FPS_WINDOW: Duration = Duration::from_secs(1);

impl FrameClock {
    pub fn new(target_fps: u32, now: Instant) -> Self {
        Self {
            interval: Duration::from_secs_f64(1.0 / target_fps.max(1) as f64),
            start: now,
            next_due: now,
            window_start: now,
            window_frames: 0,
            fps: 0.0,
        }
    }

    /// When the next frame should start
    pub fn next_deadline(&self) -> Instant {
        self.next_due
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_due
    }

    /// Seconds since the clock started
    pub fn elapsed_s(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.start).as_secs_f32()
    }

    /// Frames per second over the last full window
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Record a presented frame and schedule the next one
    ///
    /// A frame that ran late does not trigger catch-up frames: the schedule
    /// restarts one interval from `now`.
    pub fn tick(&mut self, now: Instant) {
        self.next_due += self.interval;
        if self.next_due <= now {
            self.next_due = now + self.interval;
        }

        self.window_frames += 1;
        let window = now.saturating_duration_since(self.window_start);
        if window >= FPS_WINDOW {
            self.fps = self.window_frames as f32 / window.as_secs_f32();
            self.window_frames = 0;
            self.window_start = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_due_immediately() {
        let now = Instant::now();
        let clock = FrameClock::new(60, now);
        assert!(clock.is_due(now));
    }

    #[test]
    fn test_on_time_frames_keep_fixed_cadence() {
        let start = Instant::now();
        let mut clock = FrameClock::new(50, start);
        let interval = Duration::from_millis(20);

        clock.tick(start);
        assert_eq!(clock.next_deadline(), start + interval);
        assert!(!clock.is_due(start + Duration::from_millis(10)));

        clock.tick(start + Duration::from_millis(21));
        assert_eq!(clock.next_deadline(), start + interval * 2);
    }

    #[test]
    fn test_late_frame_does_not_accumulate_debt() {
        let start = Instant::now();
        let mut clock = FrameClock::new(50, start);

        let late = start + Duration::from_millis(500);
        clock.tick(late);
        assert_eq!(clock.next_deadline(), late + Duration::from_millis(20));
    }

    #[test]
    fn test_fps_measured_per_window() {
        let start = Instant::now();
        let mut clock = FrameClock::new(30, start);
        assert_eq!(clock.fps(), 0.0);

        for i in 1..=30 {
            clock.tick(start + Duration::from_secs_f64(i as f64 / 30.0));
        }
        assert!((clock.fps() - 30.0).abs() < 0.5);
        assert!((clock.elapsed_s(start + Duration::from_secs(2)) - 2.0).abs() < 1e-6);
    }
}
