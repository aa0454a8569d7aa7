use std::time::{Duration, Instant};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum WaitResult {
    /// Condition not observed yet, keep polling on later ticks
    Pending,
    /// Condition observed, the wait is over
    Ready,
    /// Deadline passed without observing the condition
    Expired,
}

/// Deadline-bounded polling state, checked synchronously once per tick.
///
/// Nothing is scheduled in the background: dropping the wait is the
/// cancellation.
#[derive(Debug, Clone)]
pub struct BoundedWait {
    started_at: Instant,
    deadline: Instant,
    interval: Duration,
    next_poll: Instant,
    poll_count: u32,
}

impl BoundedWait {
    pub fn new(now: Instant, timeout: Duration, interval: Duration) -> Self {
        Self {
            started_at: now,
            deadline: now + timeout,
            interval,
            next_poll: now,
            poll_count: 0,
        }
    }

    pub fn should_poll(&self, now: Instant) -> bool {
        now >= self.next_poll || now >= self.deadline
    }

    /// Check `ready` if a poll is due. A condition that holds on the poll that
    /// also crosses the deadline still counts as ready.
    pub fn poll(&mut self, now: Instant, ready: impl FnOnce() -> bool) -> WaitResult {
        if !self.should_poll(now) {
            return WaitResult::Pending;
        }

        self.poll_count += 1;
        if self.interval.is_zero() {
            self.next_poll = now;
        } else {
            while self.next_poll <= now {
                self.next_poll += self.interval;
            }
        }

        if ready() {
            WaitResult::Ready
        } else if now >= self.deadline {
            WaitResult::Expired
        } else {
            WaitResult::Pending
        }
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.started_at)
    }

    pub fn timeout(&self) -> Duration {
        self.deadline - self.started_at
    }

    pub fn poll_count(&self) -> u32 {
        self.poll_count
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::wait::{BoundedWait, WaitResult};
    use std::time::{Duration, Instant};

    fn wait(start: Instant) -> BoundedWait {
        BoundedWait::new(start, Duration::from_secs(5), Duration::from_millis(100))
    }

    #[test]
    fn polls_only_on_interval() {
        let start = Instant::now();
        let mut wait = wait(start);

        assert_eq!(wait.poll(start, || false), WaitResult::Pending);
        assert_eq!(wait.poll_count(), 1);

        // Not due yet, the condition must not even be evaluated
        let result = wait.poll(start + Duration::from_millis(50), || panic!("polled early"));
        assert_eq!(result, WaitResult::Pending);
        assert_eq!(wait.poll_count(), 1);

        assert_eq!(
            wait.poll(start + Duration::from_millis(100), || true),
            WaitResult::Ready
        );
        assert_eq!(wait.poll_count(), 2);
    }

    #[test]
    fn expires_at_deadline() {
        let start = Instant::now();
        let mut wait = wait(start);

        assert_eq!(
            wait.poll(start + Duration::from_millis(4_900), || false),
            WaitResult::Pending
        );
        assert_eq!(
            wait.poll(start + Duration::from_secs(5), || false),
            WaitResult::Expired
        );
        assert_eq!(wait.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn ready_wins_over_deadline() {
        let start = Instant::now();
        let mut wait = wait(start);
        assert_eq!(
            wait.poll(start + Duration::from_secs(7), || true),
            WaitResult::Ready
        );
    }
}
