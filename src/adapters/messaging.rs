use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::domain::ports::{
    MessagingApi, MessagingError, TEMPLATE_VARIABLE_COUNT, TemplateReceipt, TemplateRequest,
};

#[derive(Debug, Clone)]
pub struct MessagingSettings {
    pub graph_base_url: String,
    pub phone_number_id: String,
    pub access_token: String,
    pub timeout: Duration,
}

/// WhatsApp Cloud API sender.
#[derive(Debug, Clone)]
pub struct WhatsAppCloudClient {
    messages_url: String,
    access_token: String,
    client: Client,
}

impl WhatsAppCloudClient {
    pub fn new(settings: &MessagingSettings) -> Result<Self, MessagingError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|error| MessagingError::ClientBuild(error.into()))?;

        Ok(Self {
            messages_url: format!(
                "{}/{}/messages",
                settings.graph_base_url.trim_end_matches('/'),
                settings.phone_number_id
            ),
            access_token: settings.access_token.clone(),
            client,
        })
    }

    fn post(&self, payload: &Value) -> Result<Value, MessagingError> {
        let response = self
            .client
            .post(&self.messages_url)
            .bearer_auth(&self.access_token)
            .json(payload)
            .send()
            .map_err(|error| MessagingError::Transport(error.into()))?;

        let status = response.status();
        let body = response.text().map_err(|error| MessagingError::Transport(error.into()))?;
        let parsed = serde_json::from_str::<Value>(&body).unwrap_or(Value::String(body));

        if !status.is_success() {
            return Err(MessagingError::Provider {
                status: status.as_u16(),
                payload: parsed,
            });
        }

        Ok(parsed)
    }
}

impl MessagingApi for WhatsAppCloudClient {
    fn send_template(
        &self,
        request: &TemplateRequest<'_>,
    ) -> Result<TemplateReceipt, MessagingError> {
        let payload = template_payload(request)?;
        let response = self.post(&payload)?;

        Ok(TemplateReceipt {
            message_id: message_id(&response),
            payload: response,
        })
    }

    fn send_text(&self, recipient: &str, text: &str) -> Result<(), MessagingError> {
        if recipient.is_empty() {
            return Err(MessagingError::EmptyRecipient);
        }
        self.post(&json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "body": text }
        }))
        .map(|_| ())
    }
}

/// Validates arity before anything leaves the process.
pub fn template_payload(request: &TemplateRequest<'_>) -> Result<Value, MessagingError> {
    if request.variables.len() != TEMPLATE_VARIABLE_COUNT {
        return Err(MessagingError::VariableCount {
            expected: TEMPLATE_VARIABLE_COUNT,
            actual: request.variables.len(),
        });
    }
    if request.recipient.is_empty() {
        return Err(MessagingError::EmptyRecipient);
    }

    let parameters: Vec<Value> = request
        .variables
        .iter()
        .map(|text| json!({ "type": "text", "text": text }))
        .collect();

    Ok(json!({
        "messaging_product": "whatsapp",
        "to": request.recipient,
        "type": "template",
        "template": {
            "name": request.template_name,
            "language": { "code": request.language_code },
            "components": [
                { "type": "body", "parameters": parameters }
            ]
        }
    }))
}

fn message_id(response: &Value) -> Option<String> {
    response
        .get("messages")?
        .get(0)?
        .get("id")?
        .as_str()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{message_id, template_payload};
    use crate::domain::ports::{MessagingError, TEMPLATE_VARIABLE_COUNT, TemplateRequest};

    fn variables(count: usize) -> Vec<String> {
        (1..=count).map(|index| format!("v{index}")).collect()
    }

    #[test]
    fn builds_template_payload_with_ordered_parameters() {
        let variables = variables(TEMPLATE_VARIABLE_COUNT);
        let request = TemplateRequest {
            recipient: "5511987654321",
            template_name: "daily_report",
            language_code: "pt_BR",
            variables: &variables,
        };

        let payload = template_payload(&request).expect("payload should build");

        assert_eq!(payload["to"], "5511987654321");
        assert_eq!(payload["template"]["name"], "daily_report");
        assert_eq!(payload["template"]["language"]["code"], "pt_BR");
        let parameters = payload["template"]["components"][0]["parameters"]
            .as_array()
            .expect("parameters array");
        assert_eq!(parameters.len(), 16);
        assert_eq!(parameters[0], json!({"type": "text", "text": "v1"}));
        assert_eq!(parameters[15], json!({"type": "text", "text": "v16"}));
    }

    #[test]
    fn rejects_wrong_variable_count() {
        let variables = variables(15);
        let request = TemplateRequest {
            recipient: "5511987654321",
            template_name: "daily_report",
            language_code: "pt_BR",
            variables: &variables,
        };

        let result = template_payload(&request);

        assert!(matches!(
            result,
            Err(MessagingError::VariableCount {
                expected: 16,
                actual: 15
            })
        ));
    }

    #[test]
    fn extracts_provider_message_id() {
        let response = json!({"messages": [{"id": "wamid.HBgN"}]});

        assert_eq!(message_id(&response), Some("wamid.HBgN".to_string()));
        assert_eq!(message_id(&json!({})), None);
    }
}
