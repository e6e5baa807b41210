/// Speaker of a transcript entry. Every role maps 1:1 onto an API role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

/// One typed unit of message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentItem {
    Text {
        value: String,
    },
    /// Image embedded inline; `data` is standard base64 of the raw bytes.
    ImageRef {
        mime_type: String,
        data: String,
    },
}

impl ContentItem {
    pub fn text(value: impl Into<String>) -> Self {
        ContentItem::Text {
            value: value.into(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentItem::Text { value } => Some(value),
            ContentItem::ImageRef { .. } => None,
        }
    }

    /// `data:` URI form used both for rendering and for the outbound request.
    pub fn data_url(&self) -> Option<String> {
        match self {
            ContentItem::Text { .. } => None,
            ContentItem::ImageRef { mime_type, data } => {
                Some(format!("data:{mime_type};base64,{data}"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentItem>,
    /// Hidden messages reach the model but are never rendered.
    pub visible: bool,
    /// Set on an assistant reply whose stream broke off before completion.
    pub truncated: bool,
}

impl Message {
    pub fn new(role: Role, content: Vec<ContentItem>) -> Self {
        Self {
            role,
            content,
            visible: true,
            truncated: false,
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentItem::text(text)])
    }

    pub fn user_image(image: ContentItem) -> Self {
        Self::new(Role::User, vec![image])
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, vec![ContentItem::text(text)])
    }

    pub fn hidden_system(text: impl Into<String>) -> Self {
        Self {
            visible: false,
            ..Self::new(Role::System, vec![ContentItem::text(text)])
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role.is_assistant()
    }

    /// All text items joined with newlines; images are skipped.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentItem::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_use_api_names() {
        assert_eq!(Role::System.as_str(), "system");
        assert_eq!(Role::User.as_str(), "user");
        assert_eq!(Role::Assistant.as_str(), "assistant");
        assert!(Role::Assistant.is_assistant());
        assert!(!Role::User.is_assistant());
    }

    #[test]
    fn hidden_system_message_is_invisible() {
        let message = Message::hidden_system("steer");
        assert_eq!(message.role, Role::System);
        assert!(!message.visible);
        assert!(!message.truncated);
        assert_eq!(message.text(), "steer");
    }

    #[test]
    fn text_skips_images() {
        let message = Message::new(
            Role::User,
            vec![
                ContentItem::text("first"),
                ContentItem::ImageRef {
                    mime_type: "image/png".into(),
                    data: "AAAA".into(),
                },
                ContentItem::text("second"),
            ],
        );
        assert_eq!(message.text(), "first\nsecond");
    }

    #[test]
    fn data_url_embeds_mime_and_payload() {
        let image = ContentItem::ImageRef {
            mime_type: "image/jpeg".into(),
            data: "Zm9v".into(),
        };
        assert_eq!(
            image.data_url().as_deref(),
            Some("data:image/jpeg;base64,Zm9v")
        );
        assert_eq!(ContentItem::text("hi").data_url(), None);
    }
}
