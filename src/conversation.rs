use ratatui::text::Text;
use serde::Serialize;

/// Who authored a message. Serialized lowercase to match the wire protocol.
///
/// `Bot` is only used locally for the typing notice; real replies from the
/// backend are recorded as `System` turns, which is also how the service
/// expects to see them in the history it receives back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
    Bot,
}

/// Message content, either raw text or markdown with its rendered form.
///
/// Rendering happens once when the reply arrives; the markdown source is
/// kept because the backend wants the plain text in the history.
#[derive(Debug, Clone)]
pub enum Body {
    Plain(String),
    Rich {
        source: String,
        rendered: Text<'static>,
    },
}

impl Body {
    pub fn source(&self) -> &str {
        match self {
            Body::Plain(text) => text,
            Body::Rich { source, .. } => source,
        }
    }
}

/// A single committed turn in the conversation.
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub name: String,
    pub body: Body,
}

impl Message {
    pub fn plain(role: Role, name: &str, text: String) -> Self {
        Self {
            role,
            name: name.to_string(),
            body: Body::Plain(text),
        }
    }

    pub fn rich(role: Role, name: &str, source: String, rendered: Text<'static>) -> Self {
        Self {
            role,
            name: name.to_string(),
            body: Body::Rich { source, rendered },
        }
    }
}

/// The animated "is thinking" caption shown while a request is pending.
///
/// This is not a `Message`: it lives in its own slot so it can never leak
/// into the history sent to the backend and never needs filtering out.
#[derive(Debug, Clone)]
pub struct TypingNotice {
    pub name: String,
    pub shown: String,
}

/// The `{role, content}` shape the backend accepts.
#[derive(Debug, Serialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

/// Ordered message list plus the optional typing notice.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    typing: Option<TypingNotice>,
}

impl Conversation {
    /// Appends a committed turn. Any live typing notice is dropped first so
    /// the notice always sits below the newest real message or not at all.
    pub fn push(&mut self, message: Message) {
        self.typing = None;
        self.messages.push(message);
    }

    pub fn set_typing(&mut self, notice: TypingNotice) {
        self.typing = Some(notice);
    }

    pub fn clear_typing(&mut self) {
        self.typing = None;
    }

    pub fn typing(&self) -> Option<&TypingNotice> {
        self.typing.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.typing.is_none()
    }

    /// The full history in wire form. Rich bodies contribute their markdown
    /// source, and the typing notice is structurally absent.
    pub fn wire_history(&self) -> Vec<WireMessage> {
        self.messages
            .iter()
            .map(|message| WireMessage {
                role: message.role,
                content: message.body.source().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_drops_live_typing_notice() {
        let mut conversation = Conversation::default();
        conversation.set_typing(TypingNotice {
            name: "DoppelGPT".to_string(),
            shown: "D".to_string(),
        });
        conversation.push(Message::plain(Role::User, "You", "hello".to_string()));

        assert!(conversation.typing().is_none());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[test]
    fn wire_history_excludes_typing_notice() {
        let mut conversation = Conversation::default();
        conversation.push(Message::plain(Role::User, "You", "hello".to_string()));
        conversation.set_typing(TypingNotice {
            name: "DoppelGPT".to_string(),
            shown: "Do".to_string(),
        });

        let history = conversation.wire_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "hello");
    }

    #[test]
    fn wire_history_uses_markdown_source_for_rich_bodies() {
        let mut conversation = Conversation::default();
        let rendered = crate::markdown::render("**hi**");
        conversation.push(Message::rich(
            Role::System,
            "Max",
            "**hi**".to_string(),
            rendered,
        ));

        let history = conversation.wire_history();
        assert_eq!(history[0].content, "**hi**");
    }

    #[test]
    fn wire_history_preserves_order() {
        let mut conversation = Conversation::default();
        conversation.push(Message::plain(Role::User, "You", "first".to_string()));
        conversation.push(Message::plain(Role::System, "Max", "second".to_string()));
        conversation.push(Message::plain(Role::User, "You", "third".to_string()));

        let history = conversation.wire_history();
        let contents: Vec<&str> = history.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::Bot).unwrap(), "\"bot\"");
    }
}
