//! Generation state and the events that drive it.
//!
//! The client and studio never touch presentation state directly. They send
//! [`GenerationEvent`]s over an unbounded channel and the presentation layer
//! folds them into a [`GenerationState`] with [`GenerationState::apply`].

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::veo::{AspectRatio, Resolution, VeoError};

/// Sending half of the event channel.
pub type EventSender = mpsc::UnboundedSender<GenerationEvent>;

/// Receiving half of the event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<GenerationEvent>;

/// Create a new event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Send an event, ignoring a closed receiver.
///
/// A presentation layer that stopped listening must not abort the generation.
pub fn emit(events: &EventSender, event: GenerationEvent) {
    if events.send(event).is_err() {
        log::debug!("Event receiver dropped; continuing without progress updates");
    }
}

/// Step of a generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationPhase {
    #[default]
    Idle,
    /// Reading and encoding the still image.
    Uploading,
    /// Submitting the generation request.
    Generating,
    /// Waiting for the remote operation to finish.
    Polling,
    /// Downloading the finished video.
    Fetching,
    Completed,
    Error,
}

impl GenerationPhase {
    /// True while an attempt is in flight.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            GenerationPhase::Uploading
                | GenerationPhase::Generating
                | GenerationPhase::Polling
                | GenerationPhase::Fetching
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationPhase::Completed | GenerationPhase::Error)
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationPhase::Idle => "idle",
            GenerationPhase::Uploading => "uploading",
            GenerationPhase::Generating => "generating",
            GenerationPhase::Polling => "polling",
            GenerationPhase::Fetching => "fetching",
            GenerationPhase::Completed => "completed",
            GenerationPhase::Error => "error",
        }
    }

    /// Default progress text shown when entering the phase.
    pub fn description(&self) -> Option<&'static str> {
        match self {
            GenerationPhase::Uploading => Some("Preparing image..."),
            GenerationPhase::Generating => Some("Submitting generation request..."),
            GenerationPhase::Polling => Some("Waiting for the video to be generated..."),
            GenerationPhase::Fetching => Some("Downloading video..."),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finished video on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoResult {
    /// Where the video bytes were written.
    pub path: PathBuf,
    /// `file://` URL of `path`, playable by any local video player.
    pub url: String,
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
}

/// Failure text shown to the user, split by whether the user should pick a
/// different API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserMessage {
    /// Billing or permission problem. The selected key has been cleared.
    PermissionProblem(String),
    /// Any other failure, shown verbatim.
    Other(String),
}

impl UserMessage {
    pub fn from_error(error: &VeoError) -> Self {
        if error.is_permission_problem() {
            UserMessage::PermissionProblem(error.to_string())
        } else {
            UserMessage::Other(error.to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            UserMessage::PermissionProblem(text) | UserMessage::Other(text) => text,
        }
    }

    pub fn is_permission_problem(&self) -> bool {
        matches!(self, UserMessage::PermissionProblem(_))
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Notification sent from a running generation to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationEvent {
    Phase(GenerationPhase),
    Progress(String),
    Completed(VideoResult),
    Failed(UserMessage),
}

/// Presentation-side view of the current generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationState {
    pub phase: GenerationPhase,
    pub progress: Option<String>,
    pub error: Option<UserMessage>,
    pub video: Option<VideoResult>,
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into the state.
    ///
    /// `Completed` and `Error` are absorbing: events arriving after them are
    /// ignored until [`reset`](Self::reset).
    pub fn apply(&mut self, event: &GenerationEvent) {
        if self.phase.is_terminal() {
            log::debug!("Ignoring {:?} after terminal phase {}", event, self.phase);
            return;
        }

        match event {
            GenerationEvent::Phase(phase) => {
                self.phase = *phase;
                self.progress = phase.description().map(str::to_string);
                self.error = None;
            }
            GenerationEvent::Progress(text) => {
                self.progress = Some(text.clone());
            }
            GenerationEvent::Completed(video) => {
                self.phase = GenerationPhase::Completed;
                self.progress = None;
                self.video = Some(video.clone());
            }
            GenerationEvent::Failed(message) => {
                self.phase = GenerationPhase::Error;
                self.progress = None;
                self.error = Some(message.clone());
            }
        }
    }

    /// Return to idle, discarding any previous result or error.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_active()
    }
}
