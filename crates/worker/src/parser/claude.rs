//! Parser for Claude Code `--output-format stream-json` lines

use serde_json::Value;

use harbor_core::AgentEvent;

use super::OutputParser;

pub struct ClaudeParser;

impl ClaudeParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ClaudeParser {
    fn default() -> Self {
        Self::new()
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

impl OutputParser for ClaudeParser {
    fn parse(&self, raw: &Value) -> Option<AgentEvent> {
        match raw.get("type").and_then(Value::as_str)? {
            // Content block delta (text streaming / tool input streaming)
            "content_block_delta" => {
                let delta = raw.get("delta")?;
                match delta.get("type").and_then(Value::as_str)? {
                    "text_delta" => Some(AgentEvent::Text {
                        content: str_field(delta, "text").unwrap_or_default(),
                    }),
                    "input_json_delta" => Some(AgentEvent::ToolUseInput {
                        partial_json: str_field(delta, "partial_json").unwrap_or_default(),
                    }),
                    _ => None,
                }
            }

            // Content block start (tool use / text)
            "content_block_start" => {
                let block = raw.get("content_block")?;
                match block.get("type").and_then(Value::as_str)? {
                    "tool_use" => Some(AgentEvent::ToolUseStart {
                        tool: str_field(block, "name"),
                        id: str_field(block, "id"),
                    }),
                    "text" => Some(AgentEvent::TextStart),
                    _ => None,
                }
            }

            "content_block_stop" => Some(AgentEvent::ContentBlockStop {
                index: raw.get("index").and_then(Value::as_u64),
            }),

            "message_start" => Some(AgentEvent::MessageStart),

            // Message delta (stop reason, usage)
            "message_delta" => Some(AgentEvent::MessageDelta {
                stop_reason: raw.get("delta").and_then(|d| str_field(d, "stop_reason")),
                usage: raw
                    .get("usage")
                    .and_then(|u| serde_json::from_value(u.clone()).ok())
                    .unwrap_or_default(),
            }),

            "message_stop" => Some(AgentEvent::MessageStop),

            // Result message (final output)
            "result" => Some(AgentEvent::Result {
                session_id: str_field(raw, "session_id"),
                cost_usd: raw.get("cost_usd").and_then(Value::as_f64),
                duration_ms: raw.get("duration_ms").and_then(Value::as_u64),
                num_turns: raw.get("num_turns").and_then(Value::as_u64),
            }),

            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::Usage;
    use serde_json::json;

    fn parse(raw: serde_json::Value) -> Option<AgentEvent> {
        ClaudeParser::new().parse(&raw)
    }

    #[test]
    fn test_parse_text_delta() {
        let event = parse(json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "hi"}
        }));
        assert_eq!(
            event,
            Some(AgentEvent::Text {
                content: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_parse_input_json_delta() {
        let event = parse(json!({
            "type": "content_block_delta",
            "delta": {"type": "input_json_delta", "partial_json": "{\"path\":"}
        }));
        assert_eq!(
            event,
            Some(AgentEvent::ToolUseInput {
                partial_json: "{\"path\":".to_string()
            })
        );
    }

    #[test]
    fn test_parse_tool_use_start() {
        let event = parse(json!({
            "type": "content_block_start",
            "content_block": {"type": "tool_use", "name": "Bash", "id": "toolu_1"}
        }));
        assert_eq!(
            event,
            Some(AgentEvent::ToolUseStart {
                tool: Some("Bash".to_string()),
                id: Some("toolu_1".to_string())
            })
        );
    }

    #[test]
    fn test_parse_text_start() {
        let event = parse(json!({
            "type": "content_block_start",
            "content_block": {"type": "text"}
        }));
        assert_eq!(event, Some(AgentEvent::TextStart));
    }

    #[test]
    fn test_parse_content_block_stop() {
        let event = parse(json!({"type": "content_block_stop", "index": 2}));
        assert_eq!(event, Some(AgentEvent::ContentBlockStop { index: Some(2) }));
    }

    #[test]
    fn test_parse_message_lifecycle() {
        assert_eq!(
            parse(json!({"type": "message_start"})),
            Some(AgentEvent::MessageStart)
        );
        assert_eq!(
            parse(json!({"type": "message_stop"})),
            Some(AgentEvent::MessageStop)
        );
    }

    #[test]
    fn test_parse_message_delta_with_usage() {
        let event = parse(json!({
            "type": "message_delta",
            "delta": {"stop_reason": "end_turn"},
            "usage": {"input_tokens": 10, "output_tokens": 25}
        }));
        assert_eq!(
            event,
            Some(AgentEvent::MessageDelta {
                stop_reason: Some("end_turn".to_string()),
                usage: Usage {
                    input_tokens: 10,
                    output_tokens: 25
                }
            })
        );
    }

    #[test]
    fn test_parse_message_delta_without_usage() {
        let event = parse(json!({"type": "message_delta", "delta": {}}));
        assert_eq!(
            event,
            Some(AgentEvent::MessageDelta {
                stop_reason: None,
                usage: Usage::default()
            })
        );
    }

    #[test]
    fn test_parse_result() {
        let event = parse(json!({
            "type": "result",
            "session_id": "abc123",
            "cost_usd": 0.03,
            "duration_ms": 1200,
            "num_turns": 2
        }));
        assert_eq!(
            event,
            Some(AgentEvent::Result {
                session_id: Some("abc123".to_string()),
                cost_usd: Some(0.03),
                duration_ms: Some(1200),
                num_turns: Some(2)
            })
        );
    }

    #[test]
    fn test_unknown_shapes_are_dropped() {
        assert!(parse(json!({"type": "system"})).is_none());
        assert!(parse(json!({"no_type": true})).is_none());
        assert!(parse(json!({
            "type": "content_block_delta",
            "delta": {"type": "thinking_delta", "thinking": "..."}
        }))
        .is_none());
        assert!(parse(json!({"type": "content_block_start", "content_block": {}})).is_none());
    }

    #[test]
    fn test_parse_is_pure() {
        let parser = ClaudeParser::new();
        let raw = json!({
            "type": "content_block_delta",
            "delta": {"type": "text_delta", "text": "same"}
        });
        assert_eq!(parser.parse(&raw), parser.parse(&raw));
    }
}
