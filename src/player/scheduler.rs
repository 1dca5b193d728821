//! Cancellable timers keyed by purpose
//!
//! One slot per purpose. Arming a slot replaces whatever was pending in it,
//! so re-entering a skip window twice can never leave two timers behind.
//! Time is supplied by the caller, which makes the clock fakeable.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Purpose of a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimerSlot {
    IntroSkip,
    OutroSkip,
    StallSample,
    StallResume,
    ProgressSave,
    AutoNextTick,
    AutoNext,
    BufferingIndicator,
    ResumePromptHide,
}

impl fmt::Display for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimerSlot::IntroSkip => "intro-skip",
            TimerSlot::OutroSkip => "outro-skip",
            TimerSlot::StallSample => "stall-sample",
            TimerSlot::StallResume => "stall-recovery",
            TimerSlot::ProgressSave => "progress-save",
            TimerSlot::AutoNextTick => "auto-next-tick",
            TimerSlot::AutoNext => "auto-next",
            TimerSlot::BufferingIndicator => "buffering-indicator",
            TimerSlot::ResumePromptHide => "resume-prompt-hide",
        };
        write!(f, "{}", name)
    }
}

/// Handle for one armed instance of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub slot: TimerSlot,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    due: Duration,
    generation: u64,
    every: Option<Duration>,
}

/// Timer table driven by an externally supplied clock
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    next_generation: u64,
    pending: HashMap<TimerSlot, Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Arm a one-shot task, cancelling any previous instance of the slot
    pub fn arm(&mut self, slot: TimerSlot, delay: Duration) -> TimerToken {
        self.insert(slot, delay, None)
    }

    /// Arm a repeating task firing every `every`
    pub fn arm_repeating(&mut self, slot: TimerSlot, every: Duration) -> TimerToken {
        self.insert(slot, every, Some(every))
    }

    fn insert(&mut self, slot: TimerSlot, delay: Duration, every: Option<Duration>) -> TimerToken {
        self.next_generation += 1;
        let generation = self.next_generation;
        if self.pending.contains_key(&slot) {
            tracing::trace!(%slot, "re-arming timer");
        }
        self.pending.insert(
            slot,
            Pending {
                due: self.now + delay,
                generation,
                every,
            },
        );
        TimerToken { slot, generation }
    }

    /// Cancel a slot; returns whether anything was pending
    pub fn cancel(&mut self, slot: TimerSlot) -> bool {
        self.pending.remove(&slot).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.pending.contains_key(&slot)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `token` is still the live instance of its slot
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.pending
            .get(&token.slot)
            .map(|p| p.generation == token.generation)
            .unwrap_or(false)
    }

    /// Pop the earliest task due at or before `now`
    ///
    /// The scheduler clock moves to the task's deadline so tasks armed by
    /// the handler are measured from the moment it fired. Repeating tasks
    /// are re-armed before being returned. Ties fire in arming order.
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerToken> {
        let (slot, pending) = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .min_by(|a, b| {
                a.1.due
                    .cmp(&b.1.due)
                    .then(a.1.generation.cmp(&b.1.generation))
            })
            .map(|(slot, p)| (*slot, *p))?;

        self.now = self.now.max(pending.due);
        match pending.every {
            Some(every) => {
                self.pending.insert(
                    slot,
                    Pending {
                        due: pending.due + every,
                        ..pending
                    },
                );
            }
            None => {
                self.pending.remove(&slot);
            }
        }

        Some(TimerToken {
            slot,
            generation: pending.generation,
        })
    }

    /// Move the clock to `now` once every due task has been popped
    pub fn settle(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(s: &mut Scheduler, now: Duration) -> Vec<TimerSlot> {
        let mut fired = Vec::new();
        while let Some(token) = s.pop_due(now) {
            fired.push(token.slot);
        }
        s.settle(now);
        fired
    }

    #[test]
    fn test_one_shot_fires_once() {
        let mut s = Scheduler::new();
        s.arm(TimerSlot::IntroSkip, ms(100));
        assert!(drain(&mut s, ms(99)).is_empty());
        assert_eq!(drain(&mut s, ms(100)), vec![TimerSlot::IntroSkip]);
        assert!(drain(&mut s, ms(500)).is_empty());
    }

    #[test]
    fn test_rearm_replaces_previous() {
        let mut s = Scheduler::new();
        let first = s.arm(TimerSlot::IntroSkip, ms(100));
        let second = s.arm(TimerSlot::IntroSkip, ms(300));
        assert!(!s.is_current(first));
        assert!(s.is_current(second));
        assert!(drain(&mut s, ms(200)).is_empty());
        assert_eq!(drain(&mut s, ms(300)), vec![TimerSlot::IntroSkip]);
    }

    #[test]
    fn test_repeating_fires_each_period() {
        let mut s = Scheduler::new();
        s.arm_repeating(TimerSlot::StallSample, ms(1000));
        let fired = drain(&mut s, ms(3500));
        assert_eq!(fired.len(), 3);
        assert!(s.is_armed(TimerSlot::StallSample));
    }

    #[test]
    fn test_fires_in_deadline_order() {
        let mut s = Scheduler::new();
        s.arm(TimerSlot::AutoNext, ms(5000));
        s.arm(TimerSlot::OutroSkip, ms(100));
        assert_eq!(
            drain(&mut s, ms(6000)),
            vec![TimerSlot::OutroSkip, TimerSlot::AutoNext]
        );
    }

    #[test]
    fn test_cancel_all_prevents_firing() {
        let mut s = Scheduler::new();
        s.arm(TimerSlot::AutoNext, ms(5000));
        s.arm_repeating(TimerSlot::ProgressSave, ms(5000));
        s.cancel_all();
        assert_eq!(s.pending_count(), 0);
        assert!(drain(&mut s, ms(60_000)).is_empty());
    }
}
