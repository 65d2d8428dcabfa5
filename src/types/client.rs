//! Client-to-server protocol messages and the connect configuration.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use strum::{Display, EnumString};

use super::content::{Blob, Content, FunctionResponse};
use crate::error::{LiveError, Result};

/// One outbound message, externally tagged on the wire
/// (`{"clientContent": {...}}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LiveClientMessage {
    Setup(LiveClientSetup),
    ClientContent(LiveClientContent),
    RealtimeInput(LiveClientRealtimeInput),
    ToolResponse(LiveClientToolResponse),
}

/// First message on a fresh connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveClientSetup {
    pub model: String,
    #[serde(flatten)]
    pub config: LiveConnectConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveClientContent {
    pub turns: Vec<Content>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveClientRealtimeInput {
    pub media_chunks: Vec<Blob>,
}

/// Answers to one or more tool calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveClientToolResponse {
    #[serde(default)]
    pub function_responses: Vec<FunctionResponse>,
}

impl LiveClientToolResponse {
    pub fn new(function_responses: Vec<FunctionResponse>) -> Self {
        Self { function_responses }
    }
}

/// Output modality requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
    Image,
}

/// Session configuration, passed through to the setup message verbatim.
///
/// Keys are setup fields in wire shape (`generationConfig`,
/// `systemInstruction`, `tools`, ...). The session client never inspects
/// them; the helpers below only write well-known keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LiveConnectConfig(Map<String, Value>);

impl LiveConnectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an arbitrary JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(LiveError::InvalidArgument(format!(
                "connect config must be a JSON object, got {other}"
            ))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_response_modalities(mut self, modalities: &[Modality]) -> Self {
        self.set_generation_config("responseModalities", json!(modalities));
        self
    }

    pub fn with_voice(mut self, voice_name: impl Into<String>) -> Self {
        self.set_generation_config(
            "speechConfig",
            json!({"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": voice_name.into()}}}),
        );
        self
    }

    pub fn with_system_instruction(self, text: impl Into<String>) -> Self {
        self.with("systemInstruction", json!({"parts": [{"text": text.into()}]}))
    }

    /// Set the `tools` array (function declarations, search, ...).
    pub fn with_tools(self, tools: Value) -> Self {
        self.with("tools", tools)
    }

    fn set_generation_config(&mut self, key: &str, value: Value) {
        let mut generation = match self.0.remove("generationConfig") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        generation.insert(key.to_string(), value);
        self.0.insert("generationConfig".into(), Value::Object(generation));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Part;
    use pretty_assertions::assert_eq;

    #[test]
    fn setup_flattens_config_next_to_model() {
        let config = LiveConnectConfig::new()
            .with_response_modalities(&[Modality::Audio])
            .with_voice("Puck")
            .with_system_instruction("be brief");
        let message = LiveClientMessage::Setup(LiveClientSetup {
            model: "models/gemini-2.0-flash-exp".into(),
            config,
        });

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "setup": {
                    "model": "models/gemini-2.0-flash-exp",
                    "generationConfig": {
                        "responseModalities": ["AUDIO"],
                        "speechConfig": {"voiceConfig": {"prebuiltVoiceConfig": {"voiceName": "Puck"}}}
                    },
                    "systemInstruction": {"parts": [{"text": "be brief"}]}
                }
            })
        );
    }

    #[test]
    fn client_content_wire_shape() {
        let message = LiveClientMessage::ClientContent(LiveClientContent {
            turns: vec![Content::user(vec![Part::text("hi")])],
            turn_complete: true,
        });
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"clientContent": {"turns": [{"role": "user", "parts": [{"text": "hi"}]}], "turnComplete": true}})
        );
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(LiveConnectConfig::from_value(json!([1, 2])).is_err());
        let config = LiveConnectConfig::from_value(json!({"tools": []})).unwrap();
        assert_eq!(config.get("tools"), Some(&json!([])));
    }

    #[test]
    fn modality_string_forms_match_wire() {
        assert_eq!(Modality::Audio.to_string(), "AUDIO");
        assert_eq!("TEXT".parse::<Modality>().unwrap(), Modality::Text);
    }
}
