//! Call initiation and status tracking.

use std::{fmt, str::FromStr, sync::Arc};

use serde::Deserialize;
use shared::{
    domain::{CallOutcome, FlashCategory},
    protocol::CallRequest,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{api::VoiceAgentApi, ControllerEvent, Resolution, EVENT_CHANNEL_CAPACITY};

pub const CALL_SUCCESS_MESSAGE: &str = "Call initiated successfully!";
pub const CALL_FAILURE_FALLBACK: &str = "Something went wrong.";
pub const MISSING_PHONE_NUMBER_MESSAGE: &str = "Please enter a phone number.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CallState {
    #[default]
    Idle,
    Submitting,
    Success(CallOutcome),
    Error(String),
}

impl CallState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

/// Controls how much of a previous call's status survives a later failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Displayed fields follow the current state only.
    #[default]
    Strict,
    /// A failed submission keeps the last reported status fields on screen.
    Legacy,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Legacy => f.write_str("legacy"),
        }
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "legacy" => Ok(Self::Legacy),
            other => Err(format!(
                "unknown display mode '{other}' (expected strict or legacy)"
            )),
        }
    }
}

/// Flat view of the call panel: the flash line plus the last reported status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallDisplay {
    pub flash_message: Option<String>,
    pub flash_category: Option<FlashCategory>,
    pub status_msg: Option<String>,
    pub call_status: Option<String>,
    pub poll_result: Vec<String>,
    pub pending: bool,
}

impl CallDisplay {
    pub fn apply(&mut self, state: &CallState, mode: DisplayMode) {
        match state {
            CallState::Idle => *self = Self::default(),
            CallState::Submitting => {
                self.clear_flash();
                if mode == DisplayMode::Strict {
                    self.clear_status();
                }
            }
            CallState::Success(outcome) => {
                self.flash_message = Some(CALL_SUCCESS_MESSAGE.to_string());
                self.flash_category = Some(FlashCategory::Success);
                self.status_msg = outcome.status_msg.clone();
                self.call_status = outcome.call_status.clone();
                self.poll_result = outcome.poll_result.clone();
            }
            CallState::Error(message) => {
                self.flash_message = Some(message.clone());
                self.flash_category = Some(FlashCategory::Error);
                if mode == DisplayMode::Strict {
                    self.clear_status();
                }
            }
        }
        self.pending = state.is_pending();
    }

    fn clear_flash(&mut self) {
        self.flash_message = None;
        self.flash_category = None;
    }

    fn clear_status(&mut self) {
        self.status_msg = None;
        self.call_status = None;
        self.poll_result.clear();
    }
}

#[derive(Default)]
struct CallControllerState {
    state: CallState,
    display: CallDisplay,
    latest_seq: u64,
    shut_down: bool,
}

pub struct CallController {
    api: Arc<dyn VoiceAgentApi>,
    mode: DisplayMode,
    inner: Mutex<CallControllerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl CallController {
    pub fn new(api: Arc<dyn VoiceAgentApi>, mode: DisplayMode) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            mode,
            inner: Mutex::new(CallControllerState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> CallState {
        self.inner.lock().await.state.clone()
    }

    pub async fn display(&self) -> CallDisplay {
        self.inner.lock().await.display.clone()
    }

    /// Places one call to `phone_number` exactly as typed.
    ///
    /// Each submission gets a sequence number; a response only lands if no
    /// newer submission started meanwhile and the controller is still live.
    pub async fn submit_call(&self, phone_number: &str) -> Resolution<CallState> {
        let request = CallRequest::new(phone_number);
        let seq = {
            let mut guard = self.inner.lock().await;
            if guard.shut_down {
                return Resolution::Detached;
            }
            guard.latest_seq += 1;
            let seq = guard.latest_seq;

            if !request.has_phone_number() {
                self.transition(
                    &mut guard,
                    seq,
                    CallState::Error(MISSING_PHONE_NUMBER_MESSAGE.to_string()),
                );
                return Resolution::Applied(guard.state.clone());
            }

            self.transition(&mut guard, seq, CallState::Submitting);
            seq
        };

        info!(seq, phone_number = %request.phone_number, "submitting call request");
        let next = match self.api.initiate_call(&request).await {
            Ok(outcome) => {
                info!(seq, call_status = ?outcome.call_status, "call request accepted");
                CallState::Success(outcome)
            }
            Err(err) => {
                warn!(seq, status = ?err.status(), error = %err, "call request failed");
                CallState::Error(err.user_message(CALL_FAILURE_FALLBACK))
            }
        };

        let mut guard = self.inner.lock().await;
        if guard.shut_down {
            debug!(seq, "dropping call response received after shutdown");
            return Resolution::Detached;
        }
        if guard.latest_seq != seq {
            debug!(seq, latest = guard.latest_seq, "dropping superseded call response");
            return Resolution::Superseded;
        }
        self.transition(&mut guard, seq, next);
        Resolution::Applied(guard.state.clone())
    }

    /// Stops accepting submissions; responses still in flight are discarded.
    pub async fn shutdown(&self) {
        let mut guard = self.inner.lock().await;
        guard.shut_down = true;
        debug!(latest = guard.latest_seq, "call controller shut down");
    }

    fn transition(&self, inner: &mut CallControllerState, seq: u64, next: CallState) {
        inner.display.apply(&next, self.mode);
        inner.state = next;
        let _ = self.events.send(ControllerEvent::CallStateChanged {
            seq,
            state: inner.state.clone(),
            display: inner.display.clone(),
        });
    }
}

#[cfg(test)]
#[path = "tests/call_controller_tests.rs"]
mod tests;
