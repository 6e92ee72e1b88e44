pub mod arena;
pub mod cursor;
pub mod error;
pub mod producer;
pub mod transcript;

pub use arena::{Arena, EpisodeId, INVALID_ACTION_RETRY};
pub use cursor::HistoryCursor;
pub use error::{ArenaError, ProducerError};
pub use producer::{ActionProducer, ActionRequest, Participant, Retrying, ScriptedProducer};
pub use transcript::{write_json, ChatLine, Transcript};
