use std::collections::VecDeque;

use engine::{InputAction, InputSnapshot};

const HISTORY_CAPACITY: usize = 50;
const MAX_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChatEntry {
    pub(crate) sender: Option<String>,
    pub(crate) text: String,
}

/// Received chat lines, oldest first, bounded.
#[derive(Debug, Clone)]
pub(crate) struct ChatLog {
    entries: VecDeque<ChatEntry>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }
}

impl ChatLog {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&mut self, sender: Option<String>, text: String) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ChatEntry { sender, text });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// The newest `count` entries, oldest first.
    pub(crate) fn recent(&self, count: usize) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter().skip(self.entries.len().saturating_sub(count))
    }
}

/// The chat text box. While active it owns typed text and the hero ignores
/// movement keys.
#[derive(Debug, Clone, Default)]
pub(crate) struct ChatInput {
    active: bool,
    buffer: String,
}

impl ChatInput {
    pub(crate) fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Applies one tick of input. Returns the message to send when the box
    /// is submitted with non-blank text.
    pub(crate) fn handle(&mut self, input: &InputSnapshot) -> Option<String> {
        if input.pressed(InputAction::Chat) {
            if !self.active {
                self.active = true;
                return None;
            }
            self.active = false;
            let message = std::mem::take(&mut self.buffer);
            let message = message.trim();
            return (!message.is_empty()).then(|| message.to_string());
        }
        if !self.active {
            return None;
        }
        for _ in 0..input.backspaces() {
            self.buffer.pop();
        }
        for ch in input.typed_text().chars() {
            if self.buffer.chars().count() >= MAX_MESSAGE_CHARS {
                break;
            }
            self.buffer.push(ch);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_drops_oldest_past_capacity() {
        let mut log = ChatLog::with_capacity(2);
        for text in ["a", "b", "c"] {
            log.push(None, text.to_string());
        }

        let texts: Vec<&str> = log.recent(5).map(|entry| entry.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "c"]);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn enter_opens_types_and_submits() {
        let mut input = ChatInput::default();
        let enter = InputSnapshot::empty().with_pressed(InputAction::Chat);

        assert_eq!(input.handle(&enter), None);
        assert!(input.is_active());

        input.handle(&InputSnapshot::empty().with_typed_text("hellp"));
        input.handle(&InputSnapshot::empty().with_backspaces(1).with_typed_text("o "));
        assert_eq!(input.buffer(), "hello ");

        assert_eq!(input.handle(&enter), Some("hello".to_string()));
        assert!(!input.is_active());
        assert_eq!(input.buffer(), "");
    }

    #[test]
    fn blank_submit_sends_nothing() {
        let mut input = ChatInput::default();
        let enter = InputSnapshot::empty().with_pressed(InputAction::Chat);
        input.handle(&enter);
        input.handle(&InputSnapshot::empty().with_typed_text("   "));

        assert_eq!(input.handle(&enter), None);
    }

    #[test]
    fn typing_is_ignored_while_closed() {
        let mut input = ChatInput::default();
        input.handle(&InputSnapshot::empty().with_typed_text("wasd"));
        assert_eq!(input.buffer(), "");
    }
}
