use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashCategory {
    Success,
    Error,
}

impl FlashCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Status fields reported by the backend for one accepted call request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOutcome {
    pub status_msg: Option<String>,
    pub call_status: Option<String>,
    pub poll_result: Vec<String>,
}

/// A transcript summary in whichever shape the backend produced it.
///
/// The latest-summary endpoint yields `Timestamped` entries, the listing
/// endpoint may yield `Detailed` ones. Every field is optional so that a
/// partially populated entry still renders. A timestamped entry that also
/// carries `details` keeps them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ConversationSummary {
    Timestamped {
        id: Option<ConversationId>,
        time: Option<String>,
        transcript_summary: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Detailed {
        id: Option<ConversationId>,
        details: Option<String>,
    },
}

impl ConversationSummary {
    pub fn id(&self) -> Option<&ConversationId> {
        match self {
            Self::Timestamped { id, .. } | Self::Detailed { id, .. } => id.as_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptTurn {
    pub role: Option<String>,
    pub message: Option<String>,
    pub time_in_call_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationDetail {
    pub conversation_id: Option<ConversationId>,
    pub status: Option<String>,
    pub transcript: Vec<TranscriptTurn>,
}
