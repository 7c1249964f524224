//! Client-side controllers for placing voice agent calls and reviewing
//! conversation summaries.

pub mod api;
pub mod call_controller;
pub mod conversation_viewer;
pub mod error;
pub mod view;

pub use api::{ApiOptions, HttpVoiceAgentApi, SummaryEndpoint, VoiceAgentApi};
pub use call_controller::{CallController, CallDisplay, CallState, DisplayMode};
pub use conversation_viewer::{ConversationViewer, ViewerSnapshot};
pub use error::{ApiSetupError, RequestError, CONNECT_FAILURE_MESSAGE};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    CallStateChanged {
        seq: u64,
        state: CallState,
        display: CallDisplay,
    },
    ConversationsChanged(ViewerSnapshot),
}

/// How a request issued by a controller ended up being handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// The response was the most recent one and was applied.
    Applied(T),
    /// A newer request was issued while this one was in flight.
    Superseded,
    /// The controller was shut down before or while the request ran.
    Detached,
}

impl<T> Resolution<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::Superseded | Self::Detached => None,
        }
    }
}
