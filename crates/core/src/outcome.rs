use crate::types::Turn;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Why an episode ended. Exactly one is attached to a finished episode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndingReason {
    /// The cooperative goal was reached (word guessed, deal struck).
    #[serde(rename = "ST")]
    Success,
    /// The villagers voted out the outlier.
    #[serde(rename = "VW")]
    VillagersWin,
    /// The roster shrank below the minimum with the outlier still in it.
    #[serde(rename = "OW")]
    OutlierWin,
    /// An action could not be parsed in the configured response format.
    #[serde(rename = "EE")]
    ParseError,
    /// A participant signalled the end of the conversation.
    #[serde(rename = "CE")]
    ChatError,
    /// A participant revealed a secret it had to keep.
    #[serde(rename = "AME")]
    SecretLeaked,
    /// The step or turn budget ran out.
    #[serde(rename = "RLE")]
    RoundLimit,
}

impl EndingReason {
    /// Short code used in exported metrics.
    pub fn code(self) -> &'static str {
        match self {
            EndingReason::Success => "ST",
            EndingReason::VillagersWin => "VW",
            EndingReason::OutlierWin => "OW",
            EndingReason::ParseError => "EE",
            EndingReason::ChatError => "CE",
            EndingReason::SecretLeaked => "AME",
            EndingReason::RoundLimit => "RLE",
        }
    }
}

impl fmt::Display for EndingReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Scoring snapshot of an episode.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    pub turns: Turn,
    pub ending: EndingReason,
    /// Variant-specific figures (agreement price, eliminated players, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl Metrics {
    /// Metrics for an episode that has `ending` recorded, or hit the step
    /// budget when it has none.
    pub fn new(turns: Turn, ending: Option<EndingReason>) -> Self {
        Self {
            turns,
            ending: ending.unwrap_or(EndingReason::RoundLimit),
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_owned(), value.into());
        self
    }
}

/// Hidden setup of an episode: secrets and role assignment.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Disposition {
    pub secret: String,
    pub players: usize,
    /// Role name to the participants holding it.
    pub roles: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, Value>,
}

impl Disposition {
    /// Role held by `player`, if any.
    pub fn role_of(&self, player: &str) -> Option<&str> {
        self.roles
            .iter()
            .find(|(_, holders)| holders.iter().any(|h| h == player))
            .map(|(role, _)| role.as_str())
    }
}
