//! Plain-text rendering of transcript entries for the terminal.

use crate::core::error::ChatError;
use crate::core::message::{ContentItem, Message, Role};

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}

fn describe_image(mime_type: &str, data: &str) -> String {
    // base64 carries 3 bytes per 4 characters, minus one per `=` pad
    let padding = data.bytes().rev().take_while(|&b| b == b'=').count();
    let bytes = (data.len() / 4 * 3).saturating_sub(padding);
    if bytes >= 1024 {
        format!("[image: {mime_type}, {:.1} KiB]", bytes as f64 / 1024.0)
    } else {
        format!("[image: {mime_type}, {bytes} bytes]")
    }
}

pub fn render_message(message: &Message) -> String {
    let mut lines = vec![format!("{}:", role_label(message.role))];
    for item in &message.content {
        match item {
            ContentItem::Text { value } => lines.extend(value.lines().map(|l| format!("  {l}"))),
            ContentItem::ImageRef { mime_type, data } => {
                lines.push(format!("  {}", describe_image(mime_type, data)))
            }
        }
    }
    if message.truncated {
        lines.push("  [reply may be incomplete]".to_string());
    }
    lines.join("\n")
}

pub fn render_history<'a>(messages: impl Iterator<Item = &'a Message>) -> String {
    let rendered: Vec<String> = messages.map(render_message).collect();
    if rendered.is_empty() {
        "(no messages yet)".to_string()
    } else {
        rendered.join("\n\n")
    }
}

/// One-line user-facing report for a failed request.
pub fn describe_error(err: &ChatError) -> String {
    match err {
        _ if err.kept_partial_reply() => format!("⚠️  {err}"),
        ChatError::Cancelled => "⏹  Reply stopped; nothing was saved.".to_string(),
        _ => format!("❌ {err}"),
    }
}
