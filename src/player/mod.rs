//! Episode playback session
//!
//! - Session: lifecycle state machine and child orchestration
//! - Subtitles: track filtering, labelling and selection
//! - Server: mirror choice and persisted preference
//! - Stall: frozen-playhead detection and recovery
//! - Skip: intro/outro windows and auto-skip
//! - Progress: watch position persistence and resume
//! - Driver: tokio runtime glue for real time and backend sync

pub mod driver;
pub mod engine;
pub mod events;
pub mod progress;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod skip;
pub mod stall;
pub mod subtitles;

pub use driver::{DriverHandle, DriverInput, SessionDriver};
pub use engine::{EngineError, EngineUpdate, MediaEngine, SimulatedEngine, TextTrackInfo};
pub use events::{ErrorKind, MediaEvent, Outbox, SessionEvent, UserAction};
pub use progress::{ProgressStore, ProgressTracker};
pub use scheduler::{Scheduler, TimerSlot};
pub use server::ServerSelector;
pub use session::{PlaybackSessionController, PlaybackState, SessionOptions};
pub use skip::SkipController;
pub use stall::StallRecoveryMonitor;
pub use subtitles::SubtitleTrackResolver;
