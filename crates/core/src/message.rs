use crate::types::{Turn, MODERATOR};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Who may see a message.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl Visibility {
    /// Visible to a single participant.
    pub fn only(player: impl Into<String>) -> Self {
        Self::Only(BTreeSet::from([player.into()]))
    }

    /// Visible to an explicit group of participants.
    pub fn group<I, S>(players: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(players.into_iter().map(Into::into).collect())
    }

    pub fn includes(&self, player: &str) -> bool {
        match self {
            Visibility::All => true,
            Visibility::Only(players) => players.contains(player),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Utterance of a participant.
    #[default]
    Text,
    /// Framing emitted by the environment: rules, roles, verdicts.
    Moderator,
    /// Closing record written when a participant abandoned the conversation.
    EndOfConversation,
}

/// Content-derived fingerprint of a message.
///
/// Stateful producers remember the hash of the last message they consumed
/// and only forward newer history on the next call.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHash(String);

impl MessageHash {
    fn compute(author: &str, content: &str, turn: Turn) -> Self {
        let mut hasher = std::hash::DefaultHasher::new();
        author.hash(&mut hasher);
        content.hash(&mut hasher);
        turn.hash(&mut hasher);
        Self(format!("{:016x}", hasher.finish()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One entry of the conversation log. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Message {
    author: String,
    content: String,
    turn: Turn,
    visibility: Visibility,
    kind: MessageKind,
    timestamp: DateTime<Utc>,
    hash: MessageHash,
}

impl Message {
    pub fn new(author: impl Into<String>, content: impl Into<String>, turn: Turn) -> Self {
        let author = author.into();
        let content = content.into();
        let hash = MessageHash::compute(&author, &content, turn);
        Self {
            author,
            content,
            turn,
            visibility: Visibility::All,
            kind: MessageKind::Text,
            timestamp: Utc::now(),
            hash,
        }
    }

    /// A message authored by the environment itself.
    pub fn moderator(content: impl Into<String>, turn: Turn) -> Self {
        Self::new(MODERATOR, content, turn).with_kind(MessageKind::Moderator)
    }

    pub fn visible_to(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn hash(&self) -> &MessageHash {
        &self.hash
    }

    pub fn is_visible_to(&self, player: &str) -> bool {
        self.visibility.includes(player)
    }
}
