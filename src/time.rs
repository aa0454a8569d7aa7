use std::thread::{sleep, yield_now};
use std::time::{Duration, Instant};

/// Caps the frame rate: sleeps through most of the frame, then yields
/// for the last `spin_margin` to land close to the deadline.
pub struct FrameLimiter {
    frame_duration: Duration,
    spin_margin: Duration,
    last_frame: Instant,
}

impl FrameLimiter {
    pub fn new(max_fps: u32, spin_margin: Duration) -> Self {
        let frame_duration = if max_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / max_fps
        };
        Self {
            frame_duration,
            spin_margin: spin_margin.min(frame_duration),
            last_frame: Instant::now(),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Block until the current frame is over and return the new frame's start.
    pub fn wait(&mut self) -> Instant {
        let deadline = self.last_frame + self.frame_duration;
        let sleep_until = deadline - self.spin_margin;
        let now = Instant::now();
        if now < sleep_until {
            sleep(sleep_until - now);
        }
        while Instant::now() < deadline {
            yield_now();
        }
        self.last_frame = Instant::now();
        self.last_frame
    }
}

pub struct Clock {
    started_at: Instant,
    current: Instant,
    frame: u64,
    delta: Duration,
}

impl Clock {
    pub fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            current: now,
            frame: 0,
            delta: Duration::ZERO,
        }
    }

    pub fn advance(&mut self, now: Instant) {
        self.delta = now.saturating_duration_since(self.current);
        self.current = now;
        self.frame += 1;
    }

    pub fn now(&self) -> Instant {
        self.current
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn delta(&self) -> Duration {
        self.delta
    }

    pub fn elapsed(&self) -> Duration {
        self.current - self.started_at
    }
}
