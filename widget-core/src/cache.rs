use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::models::{ChatMessage, MessageType};

/// Client-side sequence number of a message that the server has not confirmed yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalSeq(pub u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageKey {
    Pending(LocalSeq),
    Confirmed(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CachedMessage {
    pub key: MessageKey,
    pub message: ChatMessage,
}

impl CachedMessage {
    pub fn is_pending(&self) -> bool {
        matches!(self.key, MessageKey::Pending(_))
    }

    fn server_id(&self) -> Option<&str> {
        match &self.key {
            MessageKey::Confirmed(id) => Some(id),
            MessageKey::Pending(_) => None,
        }
    }
}

/// Ordered message list shown by the widget, mixing pending previews and confirmed messages.
#[derive(Debug, Default)]
pub struct MessageCache {
    entries: Vec<CachedMessage>,
    next_seq: u64,
}

impl MessageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CachedMessage] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    pub fn find_pending(&self, seq: LocalSeq) -> Option<&ChatMessage> {
        self.entries
            .iter()
            .find(|e| e.key == MessageKey::Pending(seq))
            .map(|e| &e.message)
    }

    /// Appends a visitor preview and returns its sequence number.
    pub fn push_pending(
        &mut self,
        session_id: &str,
        message_type: MessageType,
        content: Option<String>,
        file_url: Option<String>,
    ) -> LocalSeq {
        self.next_seq += 1;
        let seq = LocalSeq(self.next_seq);
        let message = ChatMessage {
            id: format!("pending-{}", seq.0),
            session_id: session_id.to_string(),
            message_type,
            content,
            file_url,
            is_user: true,
            created_at: Utc::now(),
        };
        self.entries.push(CachedMessage { key: MessageKey::Pending(seq), message });
        seq
    }

    /// Replaces the preview `seq` with the server's messages, in the preview's slot.
    ///
    /// Confirmed ids already in the cache are skipped, so a re-sync that landed
    /// before the response does not produce duplicates. Returns `false` if the
    /// preview was not found (it was discarded or already confirmed).
    pub fn confirm(&mut self, seq: LocalSeq, confirmed: Vec<ChatMessage>) -> bool {
        let Some(slot) = self.entries.iter().position(|e| e.key == MessageKey::Pending(seq)) else {
            return false;
        };
        self.entries.remove(slot);

        let mut known: HashSet<String> = self
            .entries
            .iter()
            .filter_map(|e| e.server_id().map(str::to_string))
            .collect();
        let fresh: Vec<CachedMessage> = confirmed
            .into_iter()
            .filter(|m| known.insert(m.id.clone()))
            .map(|message| CachedMessage { key: MessageKey::Confirmed(message.id.clone()), message })
            .collect();

        let tail = self.entries.split_off(slot);
        self.entries.extend(fresh);
        self.entries.extend(tail);
        true
    }

    /// Removes the preview `seq` without replacement.
    pub fn discard(&mut self, seq: LocalSeq) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != MessageKey::Pending(seq));
        self.entries.len() != before
    }

    /// Adopts the server's list as the confirmed history; outstanding previews stay at the end.
    ///
    /// An image the server lists without a `file_url` keeps the URL already shown
    /// for it (the local preview set at confirmation).
    pub fn sync_from_server(&mut self, server: Vec<ChatMessage>) {
        let mut pending = Vec::new();
        let mut shown_urls: HashMap<String, String> = HashMap::new();
        for entry in self.entries.drain(..) {
            match entry.key {
                MessageKey::Pending(_) => pending.push(entry),
                MessageKey::Confirmed(id) => {
                    if let Some(url) = entry.message.file_url {
                        shown_urls.insert(id, url);
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        self.entries = server
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .map(|mut message| {
                if message.message_type == MessageType::Image && message.file_url.is_none() {
                    message.file_url = shown_urls.remove(&message.id);
                }
                CachedMessage { key: MessageKey::Confirmed(message.id.clone()), message }
            })
            .chain(pending)
            .collect();
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
