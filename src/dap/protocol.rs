use serde_json::Value;

/// Adapter to client message, as far as output capture is concerned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdapterMessage<'a> {
    /// `output` event carrying program or adapter text.
    Output {
        category: Option<&'a str>,
        output: &'a str,
    },
    /// Anything else: responses, other events, malformed output events.
    Other,
}

impl<'a> AdapterMessage<'a> {
    /// Classify a raw DAP message.
    ///
    /// Only `event` and `body.output` are looked at, so this also accepts
    /// messages whose `type` field is missing.
    pub fn classify(message: &'a Value) -> Self {
        if message.get("event").and_then(Value::as_str) != Some("output") {
            return AdapterMessage::Other;
        }
        let Some(body) = message.get("body") else {
            return AdapterMessage::Other;
        };
        match body.get("output").and_then(Value::as_str) {
            Some(output) => AdapterMessage::Output {
                category: body.get("category").and_then(Value::as_str),
                output,
            },
            None => AdapterMessage::Other,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_output() {
        let msg = json!({
            "seq": 7,
            "type": "event",
            "event": "output",
            "body": {"category": "stderr", "output": "panic!\n"}
        });
        assert_eq!(
            AdapterMessage::classify(&msg),
            AdapterMessage::Output {
                category: Some("stderr"),
                output: "panic!\n"
            }
        );

        let msg = json!({"event": "output", "body": {"output": ""}});
        assert_eq!(
            AdapterMessage::classify(&msg),
            AdapterMessage::Output {
                category: None,
                output: ""
            }
        );
    }

    #[test]
    fn test_classify_other() {
        let messages = [
            json!({"type": "event", "event": "terminated"}),
            json!({"type": "event", "event": "Output", "body": {"output": "x"}}),
            json!({"type": "event", "event": "output", "body": {"output": null}}),
            json!({"type": "event", "event": "output", "body": {"data": "x"}}),
            json!({"type": "response", "command": "evaluate", "body": {"result": "1"}}),
            json!([1, 2, 3]),
            Value::Null,
        ];
        for msg in &messages {
            assert_eq!(AdapterMessage::classify(msg), AdapterMessage::Other, "{msg}");
        }
    }
}
