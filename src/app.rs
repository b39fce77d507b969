use std::mem;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::client::{ChatClient, ChatError};
use crate::config::Config;
use crate::conversation::{Conversation, Message, Role, TypingNotice};
use crate::markdown;
use crate::scroll::ScrollAnchor;
use crate::typing::TypingEffect;

/// Label for the user's own turns.
const USER_NAME: &str = "You";

/// Shown when a request fails: appended to the chat after a timeout, raised
/// as an alert popup for everything else.
const APOLOGY: &str = "Sorry, it looks like we have worked my neural network a bit too hard, \
    please try again. If the issue persists, do me a solid and restart the app.";

pub struct App {
    // Core state
    pub should_quit: bool,
    pub conversation: Conversation,
    pub in_flight: bool,

    // Presentation state
    pub typing: TypingEffect,
    pub scroll: ScrollAnchor,
    pub alert: Option<String>,

    // Input state
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Identity
    pub persona_name: String,
    pub bot_name: String,
    pub greeting: String,

    // Backend session
    client: ChatClient,
    session_id: String,
    response_rx: Option<oneshot::Receiver<Result<String, ChatError>>>,
}

impl App {
    pub fn new(config: &Config, session_id: String) -> anyhow::Result<Self> {
        let client = ChatClient::new(
            &config.backend_url,
            Duration::from_secs(config.request_timeout_secs),
        )?;

        Ok(Self {
            should_quit: false,
            conversation: Conversation::default(),
            in_flight: false,

            typing: TypingEffect::new(config.thinking_caption()),
            scroll: ScrollAnchor::new(),
            alert: None,

            input: String::new(),
            input_cursor: 0,

            persona_name: config.persona_name.clone(),
            bot_name: config.bot_name.clone(),
            greeting: config.greeting(),

            client,
            session_id,
            response_rx: None,
        })
    }

    /// Commits the drafted message and fires the backend request.
    /// Does nothing for blank drafts or while a request is already pending.
    pub fn send(&mut self) {
        if self.input.trim().is_empty() || self.in_flight {
            return;
        }

        let text = mem::take(&mut self.input);
        self.input_cursor = 0;

        self.scroll.note_mutation();
        self.conversation
            .push(Message::plain(Role::User, USER_NAME, text));
        self.in_flight = true;
        self.typing.start();

        // The history snapshot includes the turn just pushed.
        let history = self.conversation.wire_history();
        let client = self.client.clone();
        let session_id = self.session_id.clone();
        let (tx, rx) = oneshot::channel();
        self.response_rx = Some(rx);

        tokio::spawn(async move {
            let result = client.complete(&history, &session_id).await;
            let _ = tx.send(result);
        });
    }

    /// Checks whether the pending request finished. Called once per event
    /// loop turn; cheap when nothing is pending.
    pub fn poll_response(&mut self) {
        let Some(rx) = self.response_rx.as_mut() else {
            return;
        };
        match rx.try_recv() {
            Ok(outcome) => {
                self.response_rx = None;
                self.finish_request(outcome);
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
            Err(oneshot::error::TryRecvError::Closed) => {
                self.response_rx = None;
                self.finish_request(Err(ChatError::Interrupted));
            }
        }
    }

    /// Applies the outcome of a finished request. The typing effect stops
    /// before the notice is removed so a later tick cannot resurrect it.
    fn finish_request(&mut self, outcome: Result<String, ChatError>) {
        self.typing.stop();
        self.scroll.note_mutation();
        self.conversation.clear_typing();
        self.in_flight = false;

        match outcome {
            Ok(reply) => {
                let rendered = markdown::render(&reply);
                self.conversation.push(Message::rich(
                    Role::System,
                    &self.persona_name,
                    reply,
                    rendered,
                ));
            }
            Err(err) if err.is_timeout() => {
                tracing::warn!("chat request timed out");
                self.conversation.push(Message::plain(
                    Role::System,
                    &self.bot_name,
                    APOLOGY.to_string(),
                ));
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                self.alert = Some(APOLOGY.to_string());
            }
        }
    }

    /// Advances the typing animation and mirrors its caption into the
    /// conversation.
    pub fn tick(&mut self) {
        if let Some(shown) = self.typing.tick() {
            self.scroll.note_mutation();
            self.conversation.set_typing(TypingNotice {
                name: self.bot_name.clone(),
                shown,
            });
        }
    }
}
