use serde::{Deserialize, Serialize};

/// Raw output of a participant for one turn.
///
/// The text is free-form and parsed by the environment according to its
/// configured response format. A producer that wants to abandon the
/// conversation raises `end_of_conversation` instead of smuggling a magic
/// string through the text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub text: String,
    #[serde(default)]
    pub end_of_conversation: bool,
}

impl Action {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_of_conversation: false,
        }
    }

    /// An action signalling that the producer ended the conversation.
    pub fn end_of_conversation(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_of_conversation: true,
        }
    }

    /// True when the action carries nothing an environment could act on.
    pub fn is_blank(&self) -> bool {
        !self.end_of_conversation && self.text.trim().is_empty()
    }
}

impl From<&str> for Action {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Action {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
