//! Payloads for the OpenAI-compatible `chat/completions` endpoint.

use serde::{Deserialize, Serialize};

use crate::core::message::{ContentItem, Message};

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatImageUrl {
    pub url: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatContentPart {
    Text { text: String },
    ImageUrl { image_url: ChatImageUrl },
}

impl From<&ContentItem> for ChatContentPart {
    fn from(item: &ContentItem) -> Self {
        match item {
            ContentItem::Text { value } => ChatContentPart::Text {
                text: value.clone(),
            },
            ContentItem::ImageRef { mime_type, data } => ChatContentPart::ImageUrl {
                image_url: ChatImageUrl {
                    url: format!("data:{mime_type};base64,{data}"),
                },
            },
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ChatContentPart>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.as_str().to_string(),
            content: message.content.iter().map(ChatContentPart::from).collect(),
        }
    }
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

#[derive(Deserialize)]
pub struct ChatResponseDelta {
    pub content: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponseChoice {
    pub delta: ChatResponseDelta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatResponseChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;
    use serde_json::json;

    #[test]
    fn messages_serialize_as_content_parts() {
        let message = Message::new(
            Role::User,
            vec![
                ContentItem::text("What is this?"),
                ContentItem::ImageRef {
                    mime_type: "image/png".into(),
                    data: "iVBO".into(),
                },
            ],
        );

        let value = serde_json::to_value(ChatMessage::from(&message)).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    {"type": "text", "text": "What is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/png;base64,iVBO"}}
                ]
            })
        );
    }

    #[test]
    fn request_carries_sampling_parameters() {
        let request = ChatRequest {
            model: "gpt-4o".into(),
            messages: vec![ChatMessage::from(&Message::hidden_system("steer"))],
            temperature: 0.3,
            max_tokens: 4096,
            stream: true,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["max_tokens"], 4096);
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "system");
        assert!((value["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn response_delta_tolerates_missing_content() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert!(response.choices[0].delta.content.is_none());
    }
}
