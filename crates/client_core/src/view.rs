//! Plain-text rendering of controller state.

use shared::domain::{ConversationDetail, ConversationSummary};

use crate::{call_controller::CallDisplay, conversation_viewer::ViewerSnapshot};

const MISSING: &str = "-";

pub fn render_call(display: &CallDisplay) -> Vec<String> {
    let mut lines = Vec::new();
    if display.pending {
        lines.push("Calling...".to_string());
    }
    if let (Some(message), Some(category)) = (&display.flash_message, display.flash_category) {
        lines.push(format!("[{}] {message}", category.as_str()));
    }
    if let Some(status_msg) = non_empty(&display.status_msg) {
        lines.push(format!("API Response: {status_msg}"));
    }
    if let Some(call_status) = non_empty(&display.call_status) {
        lines.push(format!("Call Status: {call_status}"));
    }
    if !display.poll_result.is_empty() {
        lines.push(format!("Status history: {}", display.poll_result.join(", ")));
    }
    lines
}

pub fn render_conversations(snapshot: &ViewerSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(error) = &snapshot.error {
        lines.push(format!("Error: {error}"));
    }
    if snapshot.loading {
        lines.push("Loading conversations...".to_string());
    }
    if snapshot.conversations.is_empty() && snapshot.error.is_none() && !snapshot.loading {
        lines.push("No conversations found.".to_string());
    }

    for (index, summary) in snapshot.conversations.iter().enumerate() {
        let key = summary
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| format!("#{}", index + 1));
        lines.push(key);
        match summary {
            ConversationSummary::Timestamped {
                time,
                transcript_summary,
                details,
                ..
            } => {
                lines.push(format!("  Date: {}", or_missing(time)));
                lines.push(format!("  Summary: {}", or_missing(transcript_summary)));
                if let Some(details) = details {
                    lines.push(format!("  Details: {details}"));
                }
            }
            ConversationSummary::Detailed { details, .. } => {
                lines.push(format!("  Details: {}", or_missing(details)));
            }
        }
    }
    lines
}

pub fn render_detail(detail: &ConversationDetail) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Conversation: {}",
            detail
                .conversation_id
                .as_ref()
                .map(|id| id.as_str())
                .unwrap_or(MISSING)
        ),
        format!("Status: {}", or_missing(&detail.status)),
    ];
    if detail.transcript.is_empty() {
        lines.push("Transcript: (empty)".to_string());
        return lines;
    }

    lines.push("Transcript:".to_string());
    for (index, turn) in detail.transcript.iter().enumerate() {
        let role = turn.role.as_deref().unwrap_or("?");
        let at = turn
            .time_in_call_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "?".to_string());
        lines.push(format!(
            "{}. [{role}, {at}s]: {}",
            index + 1,
            turn.message.as_deref().unwrap_or_default()
        ));
    }
    lines
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn or_missing(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}
