use crate::error::RunError;
use rand::Rng;
use rand_distr::{Distribution, Exp};
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_HICCUP_THRESHOLD: Duration = Duration::from_millis(5);

/// Upper bound on a single inter-arrival gap.
pub const MAX_GAP: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// When the next task should go out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Slot {
    /// The target is still ahead; wait for it.
    OnTime(Instant),
    /// The target already passed by `lag`. The task is sent right away but
    /// recorded as started at `target`, so the delay counts as latency.
    /// `warn` is set on the first late slot of a streak that lags by more
    /// than the hiccup threshold.
    Late {
        target: Instant,
        lag: Duration,
        warn: bool,
    },
}

/// Open-loop Poisson arrival schedule.
///
/// Targets advance by exponentially distributed gaps no matter when tasks
/// actually go out, so the offered load never adapts to the server.
pub struct Schedule<R> {
    target: Instant,
    gaps: Exp<f64>,
    rng: R,
    hiccup_threshold: Duration,
    warned: bool,
}

impl<R: Rng> Schedule<R> {
    pub fn new(start: Instant, mean_qps: f64, rng: R) -> Result<Self, RunError> {
        if !(mean_qps.is_finite() && mean_qps > 0.0) {
            return Err(RunError::InvalidRate(mean_qps));
        }
        let gaps = Exp::new(mean_qps).map_err(|_| RunError::InvalidRate(mean_qps))?;

        Ok(Self {
            target: start,
            gaps,
            rng,
            hiccup_threshold: DEFAULT_HICCUP_THRESHOLD,
            warned: false,
        })
    }

    pub fn with_hiccup_threshold(mut self, threshold: Duration) -> Self {
        self.hiccup_threshold = threshold;
        self
    }

    pub fn target(&self) -> Instant {
        self.target
    }

    /// Samples the next gap, clamped to [`MAX_GAP`].
    pub fn next_gap(&mut self) -> Duration {
        let secs = self.gaps.sample(&mut self.rng);
        Duration::try_from_secs_f64(secs).map_or(MAX_GAP, |gap| gap.min(MAX_GAP))
    }

    pub fn next_slot(&mut self, now: Instant) -> Slot {
        let gap = self.next_gap();
        self.target += gap;

        if self.target > now {
            self.warned = false;
            return Slot::OnTime(self.target);
        }

        let lag = now.duration_since(self.target);
        let warn = !self.warned && lag > self.hiccup_threshold;
        if warn {
            self.warned = true;
        }
        Slot::Late {
            target: self.target,
            lag,
            warn,
        }
    }
}
