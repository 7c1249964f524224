//! Transcript summary retrieval.

use std::sync::Arc;

use shared::domain::{ConversationDetail, ConversationId, ConversationSummary};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use crate::{
    api::{SummaryEndpoint, VoiceAgentApi},
    error::RequestError,
    ControllerEvent, Resolution, EVENT_CHANNEL_CAPACITY,
};

pub const FETCH_FAILURE_FALLBACK: &str = "Failed to fetch conversations.";
pub const DETAIL_FAILURE_FALLBACK: &str = "Failed to fetch conversation.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewerSnapshot {
    pub conversations: Vec<ConversationSummary>,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Default)]
struct ViewerState {
    snapshot: ViewerSnapshot,
    generation: u64,
    deactivated: bool,
}

pub struct ConversationViewer {
    api: Arc<dyn VoiceAgentApi>,
    endpoint: SummaryEndpoint,
    inner: Mutex<ViewerState>,
    events: broadcast::Sender<ControllerEvent>,
}

impl ConversationViewer {
    pub fn new(api: Arc<dyn VoiceAgentApi>, endpoint: SummaryEndpoint) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            api,
            endpoint,
            inner: Mutex::new(ViewerState::default()),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ViewerSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    /// Fetches the summary list once.
    ///
    /// Success replaces the held list wholesale. Failure keeps the previous
    /// list and records an error message instead.
    pub async fn activate(&self) -> Resolution<ViewerSnapshot> {
        let generation = {
            let mut guard = self.inner.lock().await;
            if guard.deactivated {
                return Resolution::Detached;
            }
            guard.generation += 1;
            guard.snapshot.loading = true;
            self.publish(&guard.snapshot);
            guard.generation
        };

        info!(generation, endpoint = %self.endpoint, "loading conversation summaries");
        let result = self.api.fetch_summaries(self.endpoint).await;

        let mut guard = self.inner.lock().await;
        if guard.deactivated {
            debug!(generation, "dropping summaries received after deactivation");
            return Resolution::Detached;
        }
        if guard.generation != generation {
            debug!(generation, latest = guard.generation, "dropping superseded summaries");
            return Resolution::Superseded;
        }

        match result {
            Ok(list) => {
                if list.skipped > 0 {
                    warn!(skipped = list.skipped, "ignored summary entries that were not objects");
                }
                info!(count = list.items.len(), "conversation summaries loaded");
                guard.snapshot.conversations = list.items;
                guard.snapshot.error = None;
            }
            Err(err) => {
                warn!(status = ?err.status(), error = %err, "failed to load conversation summaries");
                guard.snapshot.error = Some(err.user_message(FETCH_FAILURE_FALLBACK));
            }
        }
        guard.snapshot.loading = false;
        self.publish(&guard.snapshot);
        Resolution::Applied(guard.snapshot.clone())
    }

    /// Loads the full transcript of one conversation; does not touch the list.
    pub async fn fetch_detail(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<ConversationDetail, RequestError> {
        self.api
            .fetch_conversation(conversation_id)
            .await
            .inspect_err(|err| {
                warn!(%conversation_id, error = %err, "failed to load conversation detail");
            })
    }

    /// Detaches the viewer; fetches still in flight are discarded when they land.
    pub async fn deactivate(&self) {
        let mut guard = self.inner.lock().await;
        guard.deactivated = true;
        guard.snapshot.loading = false;
    }

    fn publish(&self, snapshot: &ViewerSnapshot) {
        let _ = self
            .events
            .send(ControllerEvent::ConversationsChanged(snapshot.clone()));
    }
}

#[cfg(test)]
#[path = "tests/conversation_viewer_tests.rs"]
mod tests;
