//! Room chat: outbound validation and the rolling history shown to the user.
//!
//! Outgoing text is trimmed and checked with [`prepare_outgoing`] before it is
//! published. Incoming [`ChatLine`]s land in a [`ChatLog`] that keeps only the
//! most recent [`CHAT_HISTORY_LEN`] lines.

use std::collections::VecDeque;

use snowpeak_net::ChatLine;

/// Number of lines a [`ChatLog`] keeps.
pub const CHAT_HISTORY_LEN: usize = 10;

/// Longest message accepted for sending, in characters.
pub const MAX_MESSAGE_LEN: usize = 500;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Reason a message was not sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRejection {
    /// Empty or whitespace-only.
    Empty,
    /// Longer than [`MAX_MESSAGE_LEN`].
    TooLong,
}

/// Trim `text` and build the line to publish for `nickname`.
pub fn prepare_outgoing(nickname: &str, text: &str) -> Result<ChatLine, ChatRejection> {
    let content = text.trim();
    if content.is_empty() {
        return Err(ChatRejection::Empty);
    }
    if content.chars().count() > MAX_MESSAGE_LEN {
        return Err(ChatRejection::TooLong);
    }
    Ok(ChatLine {
        nickname: nickname.to_string(),
        content: content.to_string(),
    })
}

// ---------------------------------------------------------------------------
// ChatLog
// ---------------------------------------------------------------------------

/// Bounded chat history, oldest first.
#[derive(Debug, Clone)]
pub struct ChatLog {
    lines: VecDeque<ChatLine>,
    capacity: usize,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self::with_capacity(CHAT_HISTORY_LEN)
    }
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// History holding at most `capacity` lines (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a line, evicting the oldest when full.
    pub fn push(&mut self, line: ChatLine) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        tracing::debug!("[chat] {}: {}", line.nickname, line.content);
        self.lines.push_back(line);
    }

    pub fn lines(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    pub fn latest(&self) -> Option<&ChatLine> {
        self.lines.back()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
