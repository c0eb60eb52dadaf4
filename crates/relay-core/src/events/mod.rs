//! Event Builder (spec §4.5) — pure constructors for the wire envelopes
//! defined in spec §6.
//!
//! No I/O, no state. Every constructor returns a [`serde_json::Value`]
//! shaped `{"event": {"<name>": {...}}}`, matching the envelope the backend
//! transport expects on the wire in both directions. Defaults mirror the
//! Python reference's `S2sEvent` class constant-for-constant.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `sessionStart.inferenceConfiguration` defaults: `{maxTokens: 1024, topP:
/// 0.95, temperature: 0.7}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InferenceConfiguration {
    pub max_tokens: u32,
    pub top_p: f32,
    pub temperature: f32,
}

impl Default for InferenceConfiguration {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            top_p: 0.95,
            temperature: 0.7,
        }
    }
}

/// Content-block type discriminator (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContentType {
    Text,
    Audio,
    Tool,
}

/// Content-block role discriminator (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    System,
    User,
    Tool,
}

/// Default system prompt, identical to the Python reference's
/// `DEFAULT_SYSTEM_PROMPT`.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly assistant. The user and you will \
    engage in a spoken dialog exchanging the transcripts of a natural real-time conversation. \
    Keep your responses short, generally two or three sentences for chatty scenarios.";

/// Default voice id (query-parameter fallback, spec §6).
pub const DEFAULT_VOICE_ID: &str = "matthew";

fn default_audio_input_config() -> Value {
    json!({
        "mediaType": "audio/lpcm",
        "sampleRateHertz": 16000,
        "sampleSizeBits": 16,
        "channelCount": 1,
        "audioType": "SPEECH",
        "encoding": "base64",
    })
}

fn default_audio_output_config(voice_id: &str) -> Value {
    json!({
        "mediaType": "audio/lpcm",
        "sampleRateHertz": 24000,
        "sampleSizeBits": 16,
        "channelCount": 1,
        "voiceId": voice_id,
        "encoding": "base64",
        "audioType": "SPEECH",
    })
}

fn default_tool_config() -> Value {
    json!({
        "tools": [
            {
                "toolSpec": {
                    "name": "getDateTool",
                    "description": "get information about the current day",
                    "inputSchema": {
                        "json": "{\"type\": \"object\", \"properties\": {}, \"required\": []}"
                    }
                }
            }
        ]
    })
}

/// Pure constructors for the backend-transport wire envelopes.
///
/// Every method is a free function in spirit (`&self` is never needed); the
/// struct exists only to namespace the constructors the way the Python
/// `S2sEvent` class does, and to let a caller override defaults via the
/// `*_with` variants without threading extra parameters through every call
/// site.
pub struct EventBuilder;

impl EventBuilder {
    /// `sessionStart` — open session.
    #[must_use]
    pub fn session_start(config: InferenceConfiguration) -> Value {
        json!({
            "event": {
                "sessionStart": {
                    "inferenceConfiguration": {
                        "maxTokens": config.max_tokens,
                        "topP": config.top_p,
                        "temperature": config.temperature,
                    }
                }
            }
        })
    }

    /// `promptStart` — begin a turn, with the default 24kHz/16-bit/mono
    /// audio output configuration and the bundled tool catalogue.
    #[must_use]
    pub fn prompt_start(prompt_name: &str, voice_id: &str) -> Value {
        json!({
            "event": {
                "promptStart": {
                    "promptName": prompt_name,
                    "textOutputConfiguration": {"mediaType": "text/plain"},
                    "audioOutputConfiguration": default_audio_output_config(voice_id),
                    "toolUseOutputConfiguration": {"mediaType": "application/json"},
                    "toolConfiguration": default_tool_config(),
                }
            }
        })
    }

    /// `contentStart` of type TEXT, role SYSTEM — used to deliver the
    /// system prompt.
    #[must_use]
    pub fn content_start_text(prompt_name: &str, content_name: &str) -> Value {
        json!({
            "event": {
                "contentStart": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "type": "TEXT",
                    "interactive": false,
                    "role": "SYSTEM",
                    "textInputConfiguration": {"mediaType": "text/plain"},
                }
            }
        })
    }

    /// `textInput` carrying the system prompt (or any other text payload).
    #[must_use]
    pub fn text_input(prompt_name: &str, content_name: &str, content: &str) -> Value {
        json!({
            "event": {
                "textInput": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "content": content,
                }
            }
        })
    }

    /// `contentStart` of type AUDIO, role USER — opens the user's audio
    /// content block, default 16kHz/16-bit/mono LPCM input.
    #[must_use]
    pub fn content_start_audio(prompt_name: &str, content_name: &str) -> Value {
        json!({
            "event": {
                "contentStart": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "type": "AUDIO",
                    "interactive": true,
                    "role": "USER",
                    "audioInputConfiguration": default_audio_input_config(),
                }
            }
        })
    }

    /// `audioInput` — one base64 LPCM audio chunk.
    #[must_use]
    pub fn audio_input(prompt_name: &str, content_name: &str, content: &str) -> Value {
        json!({
            "event": {
                "audioInput": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "content": content,
                }
            }
        })
    }

    /// `contentStart` of type TOOL, role TOOL — opens the tool-result
    /// content block the Tool Dispatcher emits in response to a `toolUse`.
    #[must_use]
    pub fn content_start_tool(prompt_name: &str, content_name: &str, tool_use_id: &str) -> Value {
        json!({
            "event": {
                "contentStart": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "interactive": false,
                    "type": "TOOL",
                    "role": "TOOL",
                    "toolResultInputConfiguration": {
                        "toolUseId": tool_use_id,
                        "type": "TEXT",
                        "textInputConfiguration": {"mediaType": "text/plain"},
                    }
                }
            }
        })
    }

    /// `toolResult` — return the tool handler's output.
    #[must_use]
    pub fn tool_result(prompt_name: &str, content_name: &str, content: &str) -> Value {
        json!({
            "event": {
                "toolResult": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                    "content": content,
                }
            }
        })
    }

    /// `contentEnd` — close a content block.
    #[must_use]
    pub fn content_end(prompt_name: &str, content_name: &str) -> Value {
        json!({
            "event": {
                "contentEnd": {
                    "promptName": prompt_name,
                    "contentName": content_name,
                }
            }
        })
    }

    /// `promptEnd` — close a turn.
    #[must_use]
    pub fn prompt_end(prompt_name: &str) -> Value {
        json!({"event": {"promptEnd": {"promptName": prompt_name}}})
    }

    /// `sessionEnd` — terminate the session. Sending this is, per spec §5,
    /// required to be the last event written to the backend input stream
    /// before `close()`.
    #[must_use]
    pub fn session_end() -> Value {
        json!({"event": {"sessionEnd": {}}})
    }

    /// Client-visible `error` envelope synthesized by the Egress Pump on a
    /// backend validation fault (spec §4.3, §7).
    #[must_use]
    pub fn validation_error(message: &str) -> Value {
        json!({"event": {"error": {"message": format!("Validation error: {message}")}}})
    }
}

/// Extract the sole event name under an inbound envelope's `event` key, per
/// spec §4.3 step 4. Returns `None` if the envelope has no `event` key or
/// `event` is not a single-key object.
#[must_use]
pub fn event_name(envelope: &Value) -> Option<&str> {
    envelope
        .get("event")
        .and_then(Value::as_object)
        .and_then(|obj| obj.keys().next())
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_start_uses_default_inference_config() {
        let envelope = EventBuilder::session_start(InferenceConfiguration::default());
        let cfg = &envelope["event"]["sessionStart"]["inferenceConfiguration"];
        assert_eq!(cfg["maxTokens"], 1024);
        assert!((cfg["topP"].as_f64().unwrap() - 0.95).abs() < 1e-9);
    }

    #[test]
    fn session_end_has_empty_body() {
        let envelope = EventBuilder::session_end();
        assert_eq!(envelope, json!({"event": {"sessionEnd": {}}}));
    }

    #[test]
    fn event_name_extracts_sole_key() {
        let envelope = json!({"event": {"toolUse": {"toolName": "getDateTool"}}});
        assert_eq!(event_name(&envelope), Some("toolUse"));
    }

    #[test]
    fn event_name_none_without_event_key() {
        assert_eq!(event_name(&json!({"raw_data": "oops"})), None);
    }

    #[test]
    fn prompt_start_defaults_audio_output_to_24k() {
        let envelope = EventBuilder::prompt_start("p1", DEFAULT_VOICE_ID);
        let audio_cfg = &envelope["event"]["promptStart"]["audioOutputConfiguration"];
        assert_eq!(audio_cfg["sampleRateHertz"], 24000);
        assert_eq!(audio_cfg["voiceId"], "matthew");
    }

    #[test]
    fn validation_error_is_prefixed() {
        let envelope = EventBuilder::validation_error("ValidationException: bad input");
        assert_eq!(
            envelope["event"]["error"]["message"],
            "Validation error: ValidationException: bad input"
        );
    }
}
