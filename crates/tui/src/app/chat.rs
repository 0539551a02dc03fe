use luke_core::llm::{Message, Role};

use crate::strings::PRIMING_PROMPT;

/// Append-only message log. Only `clear` ever removes entries.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

/// One row of the transcript the renderer draws.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranscriptEntry<'a> {
    Committed(&'a Message),
    /// The assistant turn still being received.
    Streaming(&'a str),
}

impl Conversation {
    /// Starts with the hidden system message that primes the assistant.
    pub fn primed() -> Self {
        Self {
            messages: vec![Message::system(PRIMING_PROMPT)],
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Messages the user gets to see: a leading system message is hidden.
    pub fn visible(&self) -> &[Message] {
        match self.messages.first() {
            Some(first) if first.role == Role::System => &self.messages[1..],
            _ => &self.messages,
        }
    }

    pub fn transcript<'a>(&'a self, streaming: Option<&'a str>) -> Vec<TranscriptEntry<'a>> {
        let mut out: Vec<TranscriptEntry<'a>> =
            self.visible().iter().map(TranscriptEntry::Committed).collect();
        if let Some(buffer) = streaming {
            out.push(TranscriptEntry::Streaming(buffer));
        }
        out
    }
}
