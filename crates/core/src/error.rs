use thiserror::Error;

/// Contract violations between the orchestrator and an environment.
///
/// These are never retried: they mean the two sides disagree about the
/// game state and the run has to stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("wrong player: it is {expected}'s turn, got {got}")]
    WrongPlayer { expected: String, got: String },

    #[error("{game} needs {expected} players, got {got}")]
    RosterSize {
        game: &'static str,
        expected: String,
        got: usize,
    },

    #[error("duplicate player name {0}")]
    DuplicatePlayer(String),

    #[error("{0} table is empty")]
    EmptyTable(&'static str),

    #[error("episode already ended")]
    Terminated,
}

/// Why a raw action could not be read in the configured response format.
///
/// Parse failures are reported in-band as a terminal ending, not raised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("expected exactly one JSON object, found {found}")]
    ObjectCount { found: usize },

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("no [bracketed] answer")]
    MissingBrackets,

    #[error("answer has {words} words, at most {max} allowed")]
    AnswerTooLong { words: usize, max: usize },

    #[error("`{0}` is not a number")]
    NotANumber(String),

    #[error("empty response")]
    Empty,
}
