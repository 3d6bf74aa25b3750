use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdPolicy {
    /// Divergence, in percent, an idle pair has to exceed.
    pub base: Decimal,

    /// Step of the ratchet staircase, in percent.
    pub increment: Decimal,

    /// Quiet time after the last trigger before falling back to `base`.
    pub reset_after: TimeDelta,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThresholdLevel {
    Base,
    Elevated(u32),
}

/// Per-pair alert threshold.
///
/// Only ever moves up on a trigger, and only ever goes back to base through
/// [`ThresholdState::refresh`] once the reset window has elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThresholdState {
    pub value: Decimal,
    pub last_triggered: Option<DateTime<Utc>>,
    pub steps: u32,
}

impl ThresholdState {
    pub fn base(policy: &ThresholdPolicy) -> Self {
        Self {
            value: policy.base,
            last_triggered: None,
            steps: 0,
        }
    }

    pub fn level(&self) -> ThresholdLevel {
        match self.steps {
            0 => ThresholdLevel::Base,
            n => ThresholdLevel::Elevated(n),
        }
    }

    /// Falls back to base when more than `reset_after` has passed since the
    /// last trigger. Returns whether a reset happened.
    pub fn refresh(&mut self, policy: &ThresholdPolicy, now: DateTime<Utc>) -> bool {
        match self.last_triggered {
            Some(at) if now - at > policy.reset_after => {
                *self = Self::base(policy);
                true
            }
            _ => false,
        }
    }

    /// Records a trigger at `observed_pct` and moves to the next step.
    pub fn ratchet(&mut self, policy: &ThresholdPolicy, observed_pct: Decimal, now: DateTime<Utc>) {
        self.value = next_step(observed_pct.max(self.value), policy.increment);
        self.last_triggered = Some(now);
        self.steps += 1;
    }
}

/// Smallest multiple of `increment` strictly above `observed`.
pub fn next_step(observed: Decimal, increment: Decimal) -> Decimal {
    (observed / increment).floor() * increment + increment
}
