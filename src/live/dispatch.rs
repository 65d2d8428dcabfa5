//! Inbound message classification and audio extraction.

use tracing::{debug, warn};

use super::events::LiveEvent;
use crate::types::{
    Content, LiveServerContent, LiveServerMessage, LogMessage, ModelTurnContent, Part,
    StreamingLog,
};

fn log(log_type: &str, message: impl Into<LogMessage>) -> LiveEvent {
    LiveEvent::Log(StreamingLog::new(log_type, message))
}

/// Convert one inbound message into the events it produces, in emission order.
///
/// The first populated field wins: setup-complete, tool-call,
/// tool-call-cancellation, then server-content. A message matching none
/// of them yields nothing.
pub fn dispatch(message: LiveServerMessage) -> Vec<LiveEvent> {
    if message.setup_complete.is_some() {
        debug!("setup complete");
        return vec![log("server.send", "setupComplete"), LiveEvent::SetupComplete];
    }

    if message.tool_call.is_some() {
        let payload = LogMessage::payload(&message);
        let tool_call = message.tool_call.unwrap_or_default();
        debug!(calls = tool_call.function_calls.len(), "tool call");
        return vec![log("server.toolCall", payload), LiveEvent::ToolCall(tool_call)];
    }

    if message.tool_call_cancellation.is_some() {
        let payload = LogMessage::payload(&message);
        let cancellation = message.tool_call_cancellation.unwrap_or_default();
        debug!(ids = ?cancellation.ids, "tool call cancellation");
        return vec![
            log("server.toolCallCancellation", payload),
            LiveEvent::ToolCallCancellation(cancellation),
        ];
    }

    match message.server_content {
        Some(content) => dispatch_server_content(content),
        None => {
            let fields: Vec<&String> = message.extra.keys().collect();
            warn!(?fields, "received unmatched message");
            Vec::new()
        }
    }
}

fn dispatch_server_content(content: LiveServerContent) -> Vec<LiveEvent> {
    // Interruption discards any model-turn carried by the same message.
    if content.is_interrupted() {
        debug!("generation interrupted");
        return vec![log("server.content", "interrupted"), LiveEvent::Interrupted];
    }

    let mut events = Vec::new();
    if content.is_turn_complete() {
        debug!("turn complete");
        events.push(log("server.content", "turnComplete"));
        events.push(LiveEvent::TurnComplete);
    }

    if let Some(model_turn) = content.model_turn {
        extract_model_turn(model_turn.parts, &mut events);
    }
    events
}

/// Emit one audio event per PCM part, then a single content event for the rest.
fn extract_model_turn(parts: Vec<Part>, events: &mut Vec<LiveEvent>) {
    let (audio_parts, other_parts): (Vec<Part>, Vec<Part>) =
        parts.into_iter().partition(Part::is_audio);

    for blob in audio_parts.into_iter().filter_map(|part| part.inline_data) {
        match blob.decode() {
            Ok(bytes) => {
                let description = format!("buffer ({})", bytes.len());
                events.push(LiveEvent::Audio(bytes));
                events.push(log("server.audio", description));
            }
            Err(error) => {
                warn!(%error, mime_type = %blob.mime_type, "dropping undecodable audio part");
                events.push(log("server.audio", format!("invalid audio payload: {error}")));
            }
        }
    }

    if other_parts.is_empty() {
        return;
    }

    let content = ModelTurnContent {
        model_turn: Content::from_parts(other_parts),
    };
    let payload = LogMessage::payload(&content);
    events.push(LiveEvent::Content(content));
    events.push(log("server.content", payload));
}
