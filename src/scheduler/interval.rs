use std::time::Duration;
use tokio::time::Instant;

/// Fixed-cadence deadlines for the sampling loop.
///
/// Deadlines are `start + k * period` so sleeping does not accumulate drift.
/// A tick that fires more than one period late counts the skipped periods as
/// missed and the next deadline is moved to one period after the late tick.
pub struct Interval {
    prev: Option<Instant>,
    next: Instant,
    period: Duration,
}

/// What happened when the interval was advanced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tick {
    /// Time since the previous tick, `None` on the first tick.
    pub elapsed: Option<Duration>,
    /// Periods skipped because this tick fired too late.
    pub missed: u64,
}

impl Interval {
    pub fn new(start: Instant, period: Duration) -> Self {
        Self {
            prev: None,
            next: start,
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// The instant the next tick is due.
    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// Advance the interval for a tick that fired at `now`.
    pub fn advance(&mut self, now: Instant) -> Tick {
        let late = now.saturating_duration_since(self.next);

        let missed = if late > self.period {
            (late.as_nanos() / self.period.as_nanos().max(1)) as u64
        } else {
            0
        };

        let next = self.next + self.period;

        // check if we have fallen behind
        if next > now {
            self.next = next;
        } else {
            // if we fell behind, don't sample again until the interval has
            // elapsed
            self.next = now + self.period;
        }

        let elapsed = self.prev.map(|prev| now - prev);

        self.prev = Some(now);

        Tick { elapsed, missed }
    }
}
