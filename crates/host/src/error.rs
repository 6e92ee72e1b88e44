use arena_core::EnvError;
use thiserror::Error;

/// Failure of an action producer to come up with an action at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerError {
    /// Backend call failed; worth another try.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A scripted producer has nothing left to play.
    #[error("no scripted actions left for {0}")]
    OutOfActions(String),

    /// A retrying wrapper gave up.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
}

impl ProducerError {
    /// Whether calling the producer again may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProducerError::Transport(_))
    }
}

#[derive(Debug, Error)]
pub enum ArenaError {
    #[error(transparent)]
    Env(#[from] EnvError),

    /// No structurally valid action within the retry budget.
    #[error("{player} produced no valid action in {attempts} attempts")]
    TooManyInvalidActions { player: String, attempts: u32 },

    #[error("episode already finished")]
    EpisodeFinished,

    #[error("no participant registered for player {0}")]
    MissingParticipant(String),

    #[error("participant {0} is not part of the game roster")]
    UnknownParticipant(String),

    #[error("participant {0} registered twice")]
    DuplicateParticipant(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
