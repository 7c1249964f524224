use super::*;
use std::collections::VecDeque;

use async_trait::async_trait;
use shared::{
    domain::{ConversationDetail, ConversationId},
    protocol::SummaryList,
};
use tokio::sync::oneshot;

use crate::{
    api::SummaryEndpoint,
    error::{RequestError, CONNECT_FAILURE_MESSAGE},
};

struct ScriptedReply {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<CallOutcome, RequestError>,
}

#[derive(Default)]
struct ScriptedApi {
    requests: Mutex<Vec<CallRequest>>,
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedApi {
    fn with_replies(replies: Vec<Result<CallOutcome, RequestError>>) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|result| ScriptedReply { gate: None, result })
                    .collect(),
            ),
        })
    }

    async fn push_gated(&self, result: Result<CallOutcome, RequestError>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().await.push_back(ScriptedReply {
            gate: Some(rx),
            result,
        });
        tx
    }

    async fn push(&self, result: Result<CallOutcome, RequestError>) {
        self.replies
            .lock()
            .await
            .push_back(ScriptedReply { gate: None, result });
    }

    async fn request_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

#[async_trait]
impl VoiceAgentApi for ScriptedApi {
    async fn initiate_call(&self, request: &CallRequest) -> Result<CallOutcome, RequestError> {
        self.requests.lock().await.push(request.clone());
        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .expect("unexpected call request");
        if let Some(gate) = reply.gate {
            let _ = gate.await;
        }
        reply.result
    }

    async fn fetch_summaries(
        &self,
        _endpoint: SummaryEndpoint,
    ) -> Result<SummaryList, RequestError> {
        Err(RequestError::Transport("not scripted".to_string()))
    }

    async fn fetch_conversation(
        &self,
        _conversation_id: &ConversationId,
    ) -> Result<ConversationDetail, RequestError> {
        Err(RequestError::Transport("not scripted".to_string()))
    }
}

fn ringing() -> CallOutcome {
    CallOutcome {
        status_msg: Some("ringing".to_string()),
        call_status: Some("in-progress".to_string()),
        poll_result: vec!["queued".to_string(), "ringing".to_string()],
    }
}

fn rejected(message: &str) -> RequestError {
    RequestError::RemoteRejection {
        status: 400,
        message: message.to_string(),
    }
}

async fn wait_for_requests(api: &ScriptedApi, expected: usize) {
    while api.request_count().await < expected {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn success_copies_backend_status_into_display() {
    let api = ScriptedApi::with_replies(vec![Ok(ringing())]);
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    let state = controller.submit_call("07700900123").await;
    assert_eq!(state, Resolution::Applied(CallState::Success(ringing())));

    let display = controller.display().await;
    assert_eq!(display.flash_message.as_deref(), Some(CALL_SUCCESS_MESSAGE));
    assert_eq!(display.flash_category, Some(FlashCategory::Success));
    assert_eq!(display.status_msg.as_deref(), Some("ringing"));
    assert_eq!(display.call_status.as_deref(), Some("in-progress"));
    assert_eq!(display.poll_result, vec!["queued", "ringing"]);
    assert!(!display.pending);
}

#[tokio::test]
async fn sends_each_submission_verbatim_without_deduplication() {
    let api = ScriptedApi::with_replies(vec![Ok(ringing()), Ok(ringing())]);
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    controller.submit_call(" 07700 900123 ").await;
    controller.submit_call(" 07700 900123 ").await;

    let requests = api.requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|request| request.phone_number == " 07700 900123 "));
}

#[tokio::test]
async fn legacy_mode_keeps_stale_status_after_rejection() {
    let api = ScriptedApi::with_replies(vec![Ok(ringing()), Err(rejected("invalid number"))]);
    let controller = CallController::new(api.clone(), DisplayMode::Legacy);

    controller.submit_call("07700900123").await;
    let before = controller.display().await;

    let state = controller.submit_call("123").await;
    assert_eq!(
        state,
        Resolution::Applied(CallState::Error("invalid number".to_string()))
    );

    let after = controller.display().await;
    assert_eq!(after.flash_message.as_deref(), Some("invalid number"));
    assert_eq!(after.flash_category, Some(FlashCategory::Error));
    assert_eq!(after.status_msg, before.status_msg);
    assert_eq!(after.call_status, before.call_status);
    assert_eq!(after.poll_result, before.poll_result);
}

#[tokio::test]
async fn strict_mode_clears_status_after_rejection() {
    let api = ScriptedApi::with_replies(vec![Ok(ringing()), Err(rejected("invalid number"))]);
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    controller.submit_call("07700900123").await;
    controller.submit_call("123").await;

    let display = controller.display().await;
    assert_eq!(display.flash_message.as_deref(), Some("invalid number"));
    assert_eq!(display.status_msg, None);
    assert_eq!(display.call_status, None);
    assert!(display.poll_result.is_empty());
}

#[tokio::test]
async fn transport_and_unstructured_failures_use_fixed_messages() {
    let api = ScriptedApi::with_replies(vec![
        Err(RequestError::Transport("connection refused".to_string())),
        Err(RequestError::RemoteRejectionUnstructured { status: 502 }),
    ]);
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    assert_eq!(
        controller.submit_call("07700900123").await,
        Resolution::Applied(CallState::Error(CONNECT_FAILURE_MESSAGE.to_string()))
    );
    assert_eq!(
        controller.display().await.flash_category,
        Some(FlashCategory::Error)
    );

    assert_eq!(
        controller.submit_call("07700900123").await,
        Resolution::Applied(CallState::Error(CALL_FAILURE_FALLBACK.to_string()))
    );
}

#[tokio::test]
async fn empty_phone_number_is_rejected_without_a_request() {
    let api = ScriptedApi::with_replies(Vec::new());
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    assert_eq!(
        controller.submit_call("").await,
        Resolution::Applied(CallState::Error(MISSING_PHONE_NUMBER_MESSAGE.to_string()))
    );
    assert_eq!(api.request_count().await, 0);
}

#[tokio::test]
async fn superseded_response_does_not_overwrite_newer_state() {
    let api = ScriptedApi::with_replies(Vec::new());
    let gate = api.push_gated(Ok(ringing())).await;
    api.push(Err(rejected("invalid number"))).await;
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_call("07700900111").await }
    });
    wait_for_requests(&api, 1).await;

    let second = controller.submit_call("07700900222").await;
    assert_eq!(
        second,
        Resolution::Applied(CallState::Error("invalid number".to_string()))
    );

    gate.send(()).expect("release first reply");
    assert_eq!(first.await.expect("join"), Resolution::Superseded);
    assert_eq!(
        controller.state().await,
        CallState::Error("invalid number".to_string())
    );
}

#[tokio::test]
async fn late_response_after_shutdown_is_ignored() {
    let api = ScriptedApi::with_replies(Vec::new());
    let gate = api.push_gated(Ok(ringing())).await;
    let controller = CallController::new(api.clone(), DisplayMode::Strict);

    let pending = tokio::spawn({
        let controller = controller.clone();
        async move { controller.submit_call("07700900123").await }
    });
    wait_for_requests(&api, 1).await;
    assert!(controller.display().await.pending);

    controller.shutdown().await;
    gate.send(()).expect("release reply");

    assert_eq!(pending.await.expect("join"), Resolution::Detached);
    assert_eq!(controller.state().await, CallState::Submitting);
    assert_eq!(
        controller.submit_call("07700900123").await,
        Resolution::Detached
    );
    assert_eq!(api.request_count().await, 1);
}

#[tokio::test]
async fn broadcasts_each_transition() {
    let api = ScriptedApi::with_replies(vec![Ok(ringing())]);
    let controller = CallController::new(api.clone(), DisplayMode::Strict);
    let mut rx = controller.subscribe_events();

    controller.submit_call("07700900123").await;

    match rx.recv().await.expect("submitting event") {
        ControllerEvent::CallStateChanged { seq, state, display } => {
            assert_eq!(seq, 1);
            assert_eq!(state, CallState::Submitting);
            assert!(display.pending);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match rx.recv().await.expect("success event") {
        ControllerEvent::CallStateChanged { seq, state, .. } => {
            assert_eq!(seq, 1);
            assert_eq!(state, CallState::Success(ringing()));
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn legacy_submission_clears_flash_but_keeps_status() {
    let mut display = CallDisplay::default();
    display.apply(&CallState::Success(ringing()), DisplayMode::Legacy);
    display.apply(&CallState::Submitting, DisplayMode::Legacy);

    assert!(display.pending);
    assert_eq!(display.flash_message, None);
    assert_eq!(display.flash_category, None);
    assert_eq!(display.call_status.as_deref(), Some("in-progress"));

    display.apply(&CallState::Submitting, DisplayMode::Strict);
    assert_eq!(display.call_status, None);
}

#[test]
fn display_mode_parses_config_values() {
    assert_eq!("Legacy".parse::<DisplayMode>(), Ok(DisplayMode::Legacy));
    assert_eq!(" strict ".parse::<DisplayMode>(), Ok(DisplayMode::Strict));
    assert!("loose".parse::<DisplayMode>().is_err());
}
