//! Intro/outro skip controls
//!
//! Each window is independent: its own visibility flag and its own timer
//! slot. Leaving a window cancels that window's pending auto-skip at once.

use std::time::Duration;

use crate::models::{SkipKind, SkipWindow};

use super::engine::MediaEngine;
use super::events::{Outbox, SessionEvent};
use super::scheduler::{Scheduler, TimerSlot};

/// Delay between entering a window and the automatic jump
pub const AUTO_SKIP_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy)]
struct WindowState {
    window: SkipWindow,
    visible: bool,
}

/// Shows skip buttons inside windows and performs (auto-)skips
#[derive(Debug, Default)]
pub struct SkipController {
    intro: Option<WindowState>,
    outro: Option<WindowState>,
}

impl SkipController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the session's windows; invalid ones are ignored
    pub fn attach(&mut self, intro: Option<SkipWindow>, outro: Option<SkipWindow>) {
        self.intro = Self::accept(SkipKind::Intro, intro);
        self.outro = Self::accept(SkipKind::Outro, outro);
    }

    fn accept(kind: SkipKind, window: Option<SkipWindow>) -> Option<WindowState> {
        let window = window?;
        if !window.is_valid() {
            tracing::warn!(%kind, %window, "ignoring invalid skip window");
            return None;
        }
        Some(WindowState {
            window,
            visible: false,
        })
    }

    pub fn window(&self, kind: SkipKind) -> Option<SkipWindow> {
        self.state(kind).map(|s| s.window)
    }

    pub fn is_visible(&self, kind: SkipKind) -> bool {
        self.state(kind).map(|s| s.visible).unwrap_or(false)
    }

    fn state(&self, kind: SkipKind) -> Option<&WindowState> {
        match kind {
            SkipKind::Intro => self.intro.as_ref(),
            SkipKind::Outro => self.outro.as_ref(),
        }
    }

    fn state_mut(&mut self, kind: SkipKind) -> Option<&mut WindowState> {
        match kind {
            SkipKind::Intro => self.intro.as_mut(),
            SkipKind::Outro => self.outro.as_mut(),
        }
    }

    pub fn slot(kind: SkipKind) -> TimerSlot {
        match kind {
            SkipKind::Intro => TimerSlot::IntroSkip,
            SkipKind::Outro => TimerSlot::OutroSkip,
        }
    }

    /// React to a playback tick at `position`
    pub fn on_tick(
        &mut self,
        position: f64,
        auto_skip: bool,
        scheduler: &mut Scheduler,
        outbox: &mut Outbox,
    ) {
        for kind in [SkipKind::Intro, SkipKind::Outro] {
            let Some(state) = self.state_mut(kind) else {
                continue;
            };
            let slot = Self::slot(kind);
            let inside = state.window.contains(position);

            if inside != state.visible {
                state.visible = inside;
                outbox.push(SessionEvent::SkipControl {
                    window: kind,
                    visible: inside,
                });
            }

            if !inside {
                scheduler.cancel(slot);
                continue;
            }

            // Sitting exactly on the end means the jump already happened
            let should_arm = auto_skip && position < state.window.end;
            if should_arm && !scheduler.is_armed(slot) {
                tracing::debug!(%kind, position, "arming auto-skip");
                scheduler.arm(slot, AUTO_SKIP_DELAY);
            } else if !should_arm {
                scheduler.cancel(slot);
            }
        }
    }

    /// Auto-skip timer fired; jumps only if still inside the window
    pub fn on_timer<E: MediaEngine + ?Sized>(
        &mut self,
        kind: SkipKind,
        engine: &mut E,
        outbox: &mut Outbox,
    ) -> bool {
        let Some(state) = self.state(kind).copied() else {
            return false;
        };
        let position = engine.current_time();
        if !state.window.contains(position) {
            tracing::debug!(%kind, position, "auto-skip dropped, playhead left window");
            return false;
        }
        Self::jump(kind, state.window, engine, outbox, true);
        true
    }

    /// Manual click on a visible skip button
    pub fn skip_now<E: MediaEngine + ?Sized>(
        &mut self,
        kind: SkipKind,
        engine: &mut E,
        scheduler: &mut Scheduler,
        outbox: &mut Outbox,
    ) -> bool {
        let Some(state) = self.state(kind).copied() else {
            return false;
        };
        if !state.visible {
            return false;
        }
        scheduler.cancel(Self::slot(kind));
        Self::jump(kind, state.window, engine, outbox, false);
        true
    }

    fn jump<E: MediaEngine + ?Sized>(
        kind: SkipKind,
        window: SkipWindow,
        engine: &mut E,
        outbox: &mut Outbox,
        auto: bool,
    ) {
        tracing::info!(%kind, to = window.end, auto, "skipping window");
        engine.seek(window.end);
        outbox.push(SessionEvent::Skipped {
            window: kind,
            to: window.end,
            auto,
        });
    }

    /// Cancel timers and hide every visible control
    pub fn detach(&mut self, scheduler: &mut Scheduler, outbox: &mut Outbox) {
        for kind in [SkipKind::Intro, SkipKind::Outro] {
            scheduler.cancel(Self::slot(kind));
            if let Some(state) = self.state_mut(kind) {
                if state.visible {
                    state.visible = false;
                    outbox.push(SessionEvent::SkipControl {
                        window: kind,
                        visible: false,
                    });
                }
            }
        }
    }
}
