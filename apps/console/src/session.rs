//! Line-oriented operator session over both controllers.

use std::sync::Arc;

use client_core::{
    conversation_viewer::DETAIL_FAILURE_FALLBACK,
    view::{render_call, render_conversations, render_detail},
    CallController, ControllerEvent, ConversationViewer,
};
use shared::domain::ConversationId;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::warn;

const HELP: &str = "\
commands:
  call <phone number>   place an outbound call (number is sent as typed)
  conversations         load conversation summaries
  show <id>             print one conversation transcript
  help                  show this help
  quit                  leave the session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Call { phone_number: String },
    Conversations,
    Show { conversation_id: String },
    Help,
    Quit,
}

/// Parses one input line; blank lines yield `None`.
///
/// Everything after `call ` is kept byte for byte as the phone number.
pub fn parse_command(line: &str) -> Result<Option<SessionCommand>, String> {
    let line = line.trim_end_matches(['\r', '\n']).trim_start();
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let command = match verb.trim_end() {
        "call" => SessionCommand::Call {
            phone_number: rest.to_string(),
        },
        "conversations" | "list" => SessionCommand::Conversations,
        "show" => {
            let conversation_id = rest.trim();
            if conversation_id.is_empty() {
                return Err("usage: show <conversation id>".to_string());
            }
            SessionCommand::Show {
                conversation_id: conversation_id.to_string(),
            }
        }
        "help" | "?" => SessionCommand::Help,
        "quit" | "exit" => SessionCommand::Quit,
        other => return Err(format!("unknown command '{other}'; type help")),
    };
    Ok(Some(command))
}

pub fn event_lines(event: &ControllerEvent) -> Vec<String> {
    match event {
        ControllerEvent::CallStateChanged { seq, display, .. } => render_call(display)
            .into_iter()
            .map(|line| format!("[call #{seq}] {line}"))
            .collect(),
        ControllerEvent::ConversationsChanged(snapshot) => render_conversations(snapshot)
            .into_iter()
            .map(|line| format!("[conversations] {line}"))
            .collect(),
    }
}

pub async fn run(
    calls: Arc<CallController>,
    viewer: Arc<ConversationViewer>,
) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_events(
        calls.subscribe_events(),
        viewer.subscribe_events(),
    ));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        match command {
            SessionCommand::Call { phone_number } => {
                let calls = calls.clone();
                tokio::spawn(async move {
                    calls.submit_call(&phone_number).await;
                });
            }
            SessionCommand::Conversations => {
                let viewer = viewer.clone();
                tokio::spawn(async move {
                    viewer.activate().await;
                });
            }
            SessionCommand::Show { conversation_id } => {
                let viewer = viewer.clone();
                tokio::spawn(async move {
                    let conversation_id = ConversationId(conversation_id);
                    match viewer.fetch_detail(&conversation_id).await {
                        Ok(detail) => {
                            for line in render_detail(&detail) {
                                println!("[{conversation_id}] {line}");
                            }
                        }
                        Err(err) => println!(
                            "[{conversation_id}] Error: {}",
                            err.user_message(DETAIL_FAILURE_FALLBACK)
                        ),
                    }
                });
            }
            SessionCommand::Help => println!("{HELP}"),
            SessionCommand::Quit => break,
        }
    }

    calls.shutdown().await;
    viewer.deactivate().await;
    printer.abort();
    Ok(())
}

async fn print_events(
    mut call_events: broadcast::Receiver<ControllerEvent>,
    mut viewer_events: broadcast::Receiver<ControllerEvent>,
) {
    loop {
        let received = tokio::select! {
            event = call_events.recv() => event,
            event = viewer_events.recv() => event,
        };
        match received {
            Ok(event) => {
                for line in event_lines(&event) {
                    println!("{line}");
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "dropped controller events"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
