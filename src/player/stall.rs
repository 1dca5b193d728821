//! Stall detection and single-cycle recovery
//!
//! A sample is "stalled" when the playhead has not moved since the previous
//! sample although buffered data extends well past it. Three stalled samples
//! in a row trigger one pause → seek back → resume cycle. After a cycle the
//! monitor stays disarmed until a healthy sample is seen.

use std::time::Duration;

use super::engine::MediaEngine;
use super::scheduler::{Scheduler, TimerSlot};

/// Sampling period while playing
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(1000);
/// Buffered seconds ahead of the playhead that make a frozen playhead a stall
pub const BUFFER_GAP_THRESHOLD: f64 = 0.5;
/// Consecutive stalled samples before recovery
pub const STALL_SAMPLE_THRESHOLD: u32 = 3;
/// How far recovery seeks back from the stalled position
pub const RECOVERY_SEEK_BACK: f64 = 1.0;
/// Pause between the recovery seek and resuming
pub const RECOVERY_RESUME_DELAY: Duration = Duration::from_millis(500);

/// Playhead movement smaller than this counts as "not advancing"
const POSITION_EPSILON: f64 = 0.01;

/// Result of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Not running, paused, or mid-recovery
    Skipped,
    Healthy,
    Stalled { count: u32 },
    /// Stalled again before a healthy sample re-armed recovery
    Suppressed { count: u32 },
    /// Recovery started: paused and seeked, resume pending
    Recovering { seek_to: f64 },
}

/// Watches buffered ranges against the playhead
#[derive(Debug, Default)]
pub struct StallRecoveryMonitor {
    running: bool,
    stalled_count: u32,
    last_position: Option<f64>,
    awaiting_healthy: bool,
    /// Set while a cycle is between seek and resume; holds "was playing"
    recovering: Option<bool>,
}

impl StallRecoveryMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_recovering(&self) -> bool {
        self.recovering.is_some()
    }

    pub fn stalled_count(&self) -> u32 {
        self.stalled_count
    }

    /// Begin sampling from the engine's current position
    pub fn start<E: MediaEngine + ?Sized>(&mut self, engine: &E, scheduler: &mut Scheduler) {
        self.reset();
        self.running = true;
        self.last_position = Some(engine.current_time());
        scheduler.arm_repeating(TimerSlot::StallSample, SAMPLE_INTERVAL);
        tracing::debug!("stall monitor started");
    }

    /// Halt sampling and clear all state, including a pending resume
    pub fn stop(&mut self, scheduler: &mut Scheduler) {
        scheduler.cancel(TimerSlot::StallSample);
        scheduler.cancel(TimerSlot::StallResume);
        if self.running {
            tracing::debug!("stall monitor stopped");
        }
        self.reset();
    }

    fn reset(&mut self) {
        *self = Self::default();
    }

    /// Take one sample; may start a recovery cycle
    pub fn sample<E: MediaEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        scheduler: &mut Scheduler,
    ) -> SampleOutcome {
        if !self.running || self.recovering.is_some() {
            return SampleOutcome::Skipped;
        }

        let position = engine.current_time();
        if engine.is_paused() {
            self.last_position = Some(position);
            return SampleOutcome::Skipped;
        }

        let advanced = self
            .last_position
            .map(|last| (position - last).abs() > POSITION_EPSILON)
            .unwrap_or(true);
        self.last_position = Some(position);

        let gap = engine
            .buffered_end()
            .map(|end| end - position)
            .unwrap_or(0.0);
        let stalled = !advanced && gap > BUFFER_GAP_THRESHOLD;

        if !stalled {
            if self.stalled_count > 0 || self.awaiting_healthy {
                tracing::debug!(position, "playback advancing again");
            }
            self.stalled_count = 0;
            self.awaiting_healthy = false;
            return SampleOutcome::Healthy;
        }

        self.stalled_count += 1;
        let count = self.stalled_count;
        tracing::debug!(position, gap, count, "stalled sample");

        if self.awaiting_healthy {
            return SampleOutcome::Suppressed { count };
        }
        if count < STALL_SAMPLE_THRESHOLD {
            return SampleOutcome::Stalled { count };
        }

        let seek_to = (position - RECOVERY_SEEK_BACK).max(0.0);
        let was_playing = !engine.is_paused();
        tracing::warn!(position, seek_to, "playback stalled, attempting recovery");

        engine.pause();
        engine.seek(seek_to);
        self.last_position = Some(seek_to);
        self.stalled_count = 0;
        self.awaiting_healthy = true;
        self.recovering = Some(was_playing);
        scheduler.arm(TimerSlot::StallResume, RECOVERY_RESUME_DELAY);

        SampleOutcome::Recovering { seek_to }
    }

    /// The user paused mid-cycle: keep the seek, skip the resume
    pub fn abandon_resume(&mut self) {
        if let Some(was_playing) = self.recovering.as_mut() {
            *was_playing = false;
        }
    }

    /// Resume timer fired; returns whether playback was resumed
    pub fn finish_recovery<E: MediaEngine + ?Sized>(&mut self, engine: &mut E) -> bool {
        match self.recovering.take() {
            Some(true) => {
                engine.play();
                true
            }
            _ => false,
        }
    }
}
