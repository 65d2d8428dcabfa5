//! Server-to-client protocol messages.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::content::{Content, FunctionCall};

/// One inbound message; at most one of the typed fields is expected.
///
/// Fields this crate does not dispatch on (`usageMetadata`, `goAway`,
/// `sessionResumptionUpdate`, ...) are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_complete: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call: Option<LiveServerToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_cancellation: Option<LiveServerToolCallCancellation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_content: Option<LiveServerContent>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LiveServerMessage {
    /// A `setupComplete` acknowledgement.
    pub fn setup_complete() -> Self {
        Self {
            setup_complete: Some(Value::Object(Map::new())),
            ..Default::default()
        }
    }

    pub fn tool_call(tool_call: LiveServerToolCall) -> Self {
        Self {
            tool_call: Some(tool_call),
            ..Default::default()
        }
    }

    pub fn tool_call_cancellation(cancellation: LiveServerToolCallCancellation) -> Self {
        Self {
            tool_call_cancellation: Some(cancellation),
            ..Default::default()
        }
    }

    pub fn server_content(content: LiveServerContent) -> Self {
        Self {
            server_content: Some(content),
            ..Default::default()
        }
    }
}

/// Incremental model output or turn-state flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_turn: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_complete: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_complete: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LiveServerContent {
    /// Whether the `interrupted` key was sent, whatever its value.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.is_some()
    }

    /// Whether the `turnComplete` key was sent, whatever its value.
    pub fn is_turn_complete(&self) -> bool {
        self.turn_complete.is_some()
    }
}

/// Function calls the client is expected to answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

/// Ids of previously issued calls that should not be answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerToolCallCancellation {
    #[serde(default)]
    pub ids: Vec<String>,
}

/// A model-turn carrying only the non-audio parts of a server message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelTurnContent {
    pub model_turn: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn parses_tool_call_message() {
        let message: LiveServerMessage = serde_json::from_value(json!({
            "toolCall": {"functionCalls": [{"id": "c1", "name": "lookup", "args": {"q": "x"}}]}
        }))
        .unwrap();
        let call = message.tool_call.unwrap();
        assert_eq!(call.function_calls[0].id.as_deref(), Some("c1"));
        assert_eq!(call.function_calls[0].args, json!({"q": "x"}));
    }

    #[test]
    fn setup_complete_is_an_empty_object_on_the_wire() {
        let message: LiveServerMessage =
            serde_json::from_value(json!({"setupComplete": {}})).unwrap();
        assert!(message.setup_complete.is_some());
        assert_eq!(
            serde_json::to_value(LiveServerMessage::setup_complete()).unwrap(),
            json!({"setupComplete": {}})
        );
    }

    #[test]
    fn unknown_top_level_fields_land_in_extra() {
        let message: LiveServerMessage =
            serde_json::from_value(json!({"goAway": {"timeLeft": "5s"}})).unwrap();
        assert!(message.server_content.is_none());
        assert!(message.extra.contains_key("goAway"));
    }

    #[test]
    fn flags_count_as_set_when_present() {
        let content: LiveServerContent =
            serde_json::from_value(json!({"interrupted": false, "turnComplete": true})).unwrap();
        assert!(content.is_interrupted());
        assert!(content.is_turn_complete());

        let content: LiveServerContent =
            serde_json::from_value(json!({"modelTurn": {"parts": []}})).unwrap();
        assert!(!content.is_interrupted());
        assert!(!content.is_turn_complete());
    }
}
