use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{CallOutcome, ConversationDetail, ConversationId, ConversationSummary, TranscriptTurn},
    error::DecodeError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub phone_number: String,
}

impl CallRequest {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
        }
    }

    pub fn has_phone_number(&self) -> bool {
        !self.phone_number.is_empty()
    }
}

/// Body of a successful `POST /call`.
///
/// Fields tolerate being absent or mistyped; a null `poll_result` entry is
/// the backend's record of a failed status lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallResponse {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub status_msg: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub call_status: Option<String>,
    #[serde(default, deserialize_with = "lenient_entries")]
    pub poll_result: Vec<Option<String>>,
}

impl From<CallResponse> for CallOutcome {
    fn from(response: CallResponse) -> Self {
        Self {
            status_msg: response.status_msg,
            call_status: response.call_status,
            poll_result: response
                .poll_result
                .into_iter()
                .map(Option::unwrap_or_default)
                .collect(),
        }
    }
}

/// Which summary route produced a body.
///
/// The listing route only ever answers with a `conversations` wrapper, so an
/// object without one is an empty listing rather than a lone summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummarySource {
    Listing,
    Latest,
}

/// Decoded summary list plus the number of entries that were not objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryList {
    pub items: Vec<ConversationSummary>,
    pub skipped: usize,
}

/// Parses a response body, unwrapping one level of string encoding.
///
/// Some backend builds serialize their payload twice, so the body arrives as
/// a JSON string holding the real object.
pub fn decode_json_body(bytes: &[u8]) -> Result<Value, DecodeError> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::String(inner) => match serde_json::from_str::<Value>(&inner) {
            Ok(nested @ (Value::Object(_) | Value::Array(_))) => Ok(nested),
            _ => Ok(Value::String(inner)),
        },
        other => Ok(other),
    }
}

/// Reads the status fields of a successful call response.
///
/// A body that is not an object carries no status and yields an empty outcome.
pub fn decode_call_outcome(body: Value) -> Result<CallOutcome, DecodeError> {
    let response = match body {
        body @ Value::Object(_) => serde_json::from_value::<CallResponse>(body)?,
        _ => CallResponse::default(),
    };
    Ok(response.into())
}

/// Decodes a summary body into a list.
///
/// `{ "conversations": [...] }` yields the wrapped array (missing or null
/// means empty) and a bare array is taken as is. Only the latest-summary
/// route turns any other object into a single-entry list.
pub fn decode_summaries(body: Value, source: SummarySource) -> Result<SummaryList, DecodeError> {
    match body {
        Value::Object(mut map)
            if source == SummarySource::Listing || map.contains_key("conversations") =>
        {
            match map.remove("conversations") {
                Some(Value::Array(items)) => Ok(summaries_from_items(items)),
                Some(Value::Null) | None => Ok(SummaryList::default()),
                Some(other) => Err(DecodeError::UnexpectedShape(format!(
                    "`conversations` must be an array, got {}",
                    kind(&other)
                ))),
            }
        }
        Value::Object(map) => Ok(SummaryList {
            items: vec![summary_from_object(&map)],
            skipped: 0,
        }),
        Value::Array(items) => Ok(summaries_from_items(items)),
        other => Err(DecodeError::UnexpectedShape(format!(
            "expected a summary object or list, got {}",
            kind(&other)
        ))),
    }
}

pub fn decode_conversation_detail(body: Value) -> Result<ConversationDetail, DecodeError> {
    let Value::Object(map) = body else {
        return Err(DecodeError::UnexpectedShape(format!(
            "expected a conversation object, got {}",
            kind(&body)
        )));
    };

    let transcript = map
        .get("transcript")
        .and_then(Value::as_array)
        .map(|turns| {
            turns
                .iter()
                .filter_map(Value::as_object)
                .map(|turn| TranscriptTurn {
                    role: text(turn.get("role")),
                    message: text(turn.get("message")),
                    time_in_call_secs: turn.get("time_in_call_secs").and_then(Value::as_f64),
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ConversationDetail {
        conversation_id: identifier(&map),
        status: text(map.get("status")),
        transcript,
    })
}

fn summaries_from_items(items: Vec<Value>) -> SummaryList {
    let total = items.len();
    let items: Vec<ConversationSummary> = items
        .iter()
        .filter_map(Value::as_object)
        .map(summary_from_object)
        .collect();
    SummaryList {
        skipped: total - items.len(),
        items,
    }
}

fn summary_from_object(map: &Map<String, Value>) -> ConversationSummary {
    let id = identifier(map);
    let time = text(map.get("time")).or_else(|| {
        map.get("start_time_unix_secs")
            .and_then(Value::as_i64)
            .and_then(format_unix_secs)
    });
    let transcript_summary =
        text(map.get("transcript_summary")).or_else(|| text(map.get("call_summary_title")));
    let details = text(map.get("details"));

    if time.is_none() && transcript_summary.is_none() && details.is_some() {
        ConversationSummary::Detailed { id, details }
    } else {
        ConversationSummary::Timestamped {
            id,
            time,
            transcript_summary,
            details,
        }
    }
}

fn identifier(map: &Map<String, Value>) -> Option<ConversationId> {
    text(map.get("id"))
        .or_else(|| text(map.get("conversation_id")))
        .map(ConversationId)
}

fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(text(Some(&value)))
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(entries) => Ok(entries.iter().map(|entry| text(Some(entry))).collect()),
        _ => Ok(Vec::new()),
    }
}

fn format_unix_secs(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
