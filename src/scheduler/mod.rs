use crate::{Engine, Error, MetricSource, Renderer, Result, SampledResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, error, warn};

mod interval;

pub use interval::{Interval, Tick};

pub const DEFAULT_MAX_FAILURES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Sampling,
    Stopped,
}

/// Requests a graceful stop. The scheduler notices it at the next tick
/// boundary, or immediately while it is waiting for one.
#[derive(Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    async fn stopped(&self) {
        if !self.is_stopped() {
            self.notify.notified().await;
        }
    }
}

/// Totals for a completed run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    /// Results produced and rendered.
    pub ticks: u64,
    /// Ticks missed for lateness or failed fetches.
    pub missed: u64,
    /// Failed fetches.
    pub failures: u64,
}

#[derive(Debug)]
pub enum TickOutcome {
    Sampled(SampledResult),
    /// The fetch failed transiently. Nothing was recorded.
    Missed,
}

/// Drives an [`Engine`] from a [`MetricSource`] at a fixed interval.
pub struct Scheduler<S> {
    engine: Engine,
    source: S,
    names: Vec<String>,
    period: Duration,
    timeout: Duration,
    max_failures: u32,
    samples: Option<u64>,
    state: SchedulerState,
    stop: StopHandle,
    failures: u32,
    pending: u64,
    summary: Summary,
    // wall clock anchor, advanced by the monotonic clock
    epoch: (SystemTime, Instant),
}

impl<S: MetricSource> Scheduler<S> {
    pub fn new(engine: Engine, source: S, period: Duration) -> Self {
        Self {
            names: engine.names(),
            engine,
            source,
            period,
            timeout: period,
            max_failures: DEFAULT_MAX_FAILURES,
            samples: None,
            state: SchedulerState::Idle,
            stop: StopHandle::new(),
            failures: 0,
            pending: 0,
            summary: Summary::default(),
            epoch: (SystemTime::now(), Instant::now()),
        }
    }

    /// Bound on a single fetch. Defaults to the interval.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    /// Stop after this many results. Runs until stopped when `None`.
    pub fn samples(mut self, samples: Option<u64>) -> Self {
        self.samples = samples;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn now(&self) -> SystemTime {
        self.epoch.0 + Instant::now().saturating_duration_since(self.epoch.1)
    }

    /// Run one sampling cycle.
    ///
    /// Transient fetch failures are reported as [`TickOutcome::Missed`] until
    /// `max_failures` of them happen in a row, which is fatal. Any other
    /// error is fatal immediately. After a fatal error the scheduler is
    /// stopped and further ticks fail.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        if self.state == SchedulerState::Stopped {
            return Err(Error::Stopped);
        }

        self.state = SchedulerState::Sampling;

        let fetched = match tokio::time::timeout(self.timeout, self.source.fetch(&self.names)).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::SourceTimeout(self.timeout)),
        };

        let timestamp = self.now();

        let outcome = match fetched {
            Ok(fetch) => match self.engine.ingest(timestamp, fetch) {
                Ok(mut result) => {
                    self.failures = 0;
                    result.missed = std::mem::take(&mut self.pending);
                    TickOutcome::Sampled(result)
                }
                Err(e) => {
                    self.state = SchedulerState::Stopped;
                    return Err(e);
                }
            },
            Err(e) if e.is_transient() => {
                self.failures += 1;
                self.pending += 1;
                self.summary.failures += 1;
                self.summary.missed += 1;

                warn!(
                    "sampling failed ({} of {}): {e}",
                    self.failures, self.max_failures
                );

                // instance ids are not stable across a reconnect
                if matches!(e, Error::SourceUnavailable(_)) {
                    self.engine.reset();
                }

                if self.failures >= self.max_failures {
                    self.state = SchedulerState::Stopped;
                    return Err(Error::TooManyFailures {
                        failures: self.failures,
                        last: Box::new(e),
                    });
                }

                TickOutcome::Missed
            }
            Err(e) => {
                self.state = SchedulerState::Stopped;
                return Err(e);
            }
        };

        self.state = SchedulerState::Idle;

        Ok(outcome)
    }

    /// Sample until stopped, until the sample limit is reached, or until a
    /// fatal error. The renderer is flushed before returning either way.
    pub async fn run<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> Result<Summary> {
        let mut interval = Interval::new(Instant::now(), self.period);

        let result = loop {
            if self.stop.is_stopped() {
                debug!("stop requested");
                break Ok(());
            }

            if self.samples.is_some_and(|limit| self.summary.ticks >= limit) {
                break Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep_until(interval.deadline()) => {}
                _ = self.stop.stopped() => continue,
            }

            let tick = interval.advance(Instant::now());

            if tick.missed > 0 {
                warn!("missed {} ticks", tick.missed);
                self.pending += tick.missed;
                self.summary.missed += tick.missed;
            }

            if let Some(elapsed) = tick.elapsed {
                debug!("tick after {elapsed:?}");
            }

            match self.tick().await {
                Ok(TickOutcome::Sampled(result)) => {
                    self.summary.ticks += 1;
                    if let Err(e) = renderer.render(&result) {
                        break Err(e);
                    }
                }
                Ok(TickOutcome::Missed) => {}
                Err(e) => break Err(e),
            }
        };

        let flushed = renderer.flush();

        self.state = SchedulerState::Stopped;

        if let Err(e) = &result {
            error!("sampling stopped: {e}");
        }

        result?;
        flushed?;

        Ok(self.summary)
    }
}
