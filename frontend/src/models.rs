use toledoia_widget_core::{CachedMessage, ChatMessage, MessageKey, MessageType};

/// What a message bubble displays.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Text(String),
    Image { url: String, alt: String },
    File { url: Option<String>, name: String },
}

impl Body {
    pub fn of(message: &ChatMessage) -> Self {
        let content = message.content.clone().unwrap_or_default();
        match (message.message_type, &message.file_url) {
            (MessageType::Image, Some(url)) => Body::Image { url: url.clone(), alt: content },
            (MessageType::Image | MessageType::File, url) => Body::File {
                url: url.clone(),
                name: if content.is_empty() { "arquivo".to_string() } else { content },
            },
            (MessageType::Text, _) => Body::Text(content),
        }
    }
}

/// Stable key for `<For>`; a preview and its confirmed replacement get different keys.
pub fn entry_key(entry: &CachedMessage) -> String {
    match &entry.key {
        MessageKey::Pending(seq) => format!("pending-{}", seq.0),
        MessageKey::Confirmed(id) => id.clone(),
    }
}

pub fn bubble_class(entry: &CachedMessage) -> &'static str {
    match (entry.message.is_user, entry.is_pending()) {
        (true, true) => "message user pending",
        (true, false) => "message user",
        (false, _) => "message assistant",
    }
}
