// src/message.rs

/// Rich card attached to a standalone message.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Embed {
    pub title: String,
    pub description: String,
    /// Hex colour without the leading `#`, e.g. `"299617"`.
    pub color: Option<String>,
    pub footer: Option<String>,
    pub thumbnail_url: Option<String>,
    pub url: Option<String>,
}

/// One rendered event. `text` is always set; it is what goes into batches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub embed: Option<Embed>,
}

impl Message {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            embed: None,
        }
    }

    pub fn with_embed(text: impl Into<String>, embed: Embed) -> Self {
        Self {
            text: text.into(),
            embed: Some(embed),
        }
    }
}

/// What a single sink call carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Single(Message),
    Batch { header: String, messages: Vec<Message> },
}

impl Notification {
    pub fn message_count(&self) -> usize {
        match self {
            Notification::Single(_) => 1,
            Notification::Batch { messages, .. } => messages.len(),
        }
    }

    /// Header line followed by one line per message.
    pub fn plain_text(&self) -> String {
        match self {
            Notification::Single(m) => m.text.clone(),
            Notification::Batch { header, messages } => {
                let mut out = header.clone();
                for m in messages {
                    out.push('\n');
                    out.push_str(&m.text);
                }
                out
            }
        }
    }
}

/// How new messages from one cycle are grouped into sink calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchPolicy {
    /// Two or more messages collapse into one call under a header.
    Combine,
    /// Every message is its own call.
    Separate,
}

/// Group a cycle's messages into notifications. Zero messages -> zero calls.
pub fn plan_notifications(
    messages: Vec<Message>,
    policy: BatchPolicy,
    noun_plural: &str,
) -> Vec<Notification> {
    match (messages.len(), policy) {
        (0, _) => Vec::new(),
        (1, _) | (_, BatchPolicy::Separate) => {
            messages.into_iter().map(Notification::Single).collect()
        }
        (n, BatchPolicy::Combine) => vec![Notification::Batch {
            header: format!("Multiple new {noun_plural} ({n}):"),
            messages,
        }],
    }
}
