//! Audio announcements: a chime phase followed by a speech phase.
//!
//! Each phase walks `Idle → AttemptPrimary → AttemptFallback → Done` and is
//! resolved exactly once through a [`completion::PhaseGuard`].

pub mod announcer;
pub mod chime;
pub mod completion;
pub mod local_speech;
pub mod speech;

pub use announcer::{Announce, AnnouncementReport, Announcer};
pub use chime::{ChimeOutcome, ChimePhase, ChimeTimings};
pub use completion::{PhaseGuard, PhaseState};
pub use local_speech::{
    CommandExecutor, CommandSpeech, LocalSpeech, MockSpeech, NullSpeech, SystemCommandExecutor,
};
pub use speech::{SpeechOutcome, SpeechPhase, SpeechSettings};
