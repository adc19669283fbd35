use serde_json::Value;

pub const OPT_OUT_REPLY: &str =
    "Ok. Você foi removido e não receberá mais mensagens. Para voltar, responda START.";
pub const OPT_IN_REPLY: &str = "Perfeito. Você voltou a receber mensagens do SolarBrain.";

const OPT_OUT_KEYWORDS: &[&str] = &["STOP", "PARAR", "CANCELAR", "UNSUBSCRIBE"];
const OPT_IN_KEYWORDS: &[&str] = &["START", "INICIAR"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundCommand {
    OptOut,
    OptIn,
}

impl InboundCommand {
    pub fn reply(self) -> &'static str {
        match self {
            InboundCommand::OptOut => OPT_OUT_REPLY,
            InboundCommand::OptIn => OPT_IN_REPLY,
        }
    }
}

/// Whole-message keyword match, case-insensitive. Anything else is not a command.
pub fn parse_command(text: &str) -> Option<InboundCommand> {
    let keyword = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase();
    if OPT_OUT_KEYWORDS.contains(&keyword.as_str()) {
        Some(InboundCommand::OptOut)
    } else if OPT_IN_KEYWORDS.contains(&keyword.as_str()) {
        Some(InboundCommand::OptIn)
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub from: String,
    pub text: String,
}

/// Text messages from a webhook delivery (`entry[].changes[].value.messages[]`).
/// Non-text messages and malformed entries are skipped.
pub fn extract_inbound_messages(payload: &Value) -> Vec<InboundMessage> {
    let mut messages = Vec::new();

    for entry in array(payload, "entry") {
        for change in array(entry, "changes") {
            let Some(value) = change.get("value") else {
                continue;
            };
            for message in array(value, "messages") {
                let from = message.get("from").and_then(Value::as_str);
                let text = message
                    .get("text")
                    .and_then(|text| text.get("body"))
                    .and_then(Value::as_str);
                if let (Some(from), Some(text)) = (from, text) {
                    messages.push(InboundMessage {
                        from: from.to_string(),
                        text: text.to_string(),
                    });
                }
            }
        }
    }

    messages
}

fn array<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}
