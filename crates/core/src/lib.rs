pub mod envelope;
pub mod error;
pub mod format;
pub mod game;
pub mod message;
pub mod outcome;
pub mod pool;
pub mod text;
pub mod types;

pub use envelope::Action;
pub use error::{EnvError, ParseError};
pub use format::{Expect, ParsedAction, ResponseFormat, UnknownFormat};
pub use game::{ends_conversation, Environment, TimeStep};
pub use message::{Message, MessageHash, MessageKind, Visibility};
pub use outcome::{Disposition, EndingReason, Metrics};
pub use pool::MessagePool;
pub use types::{zero_rewards, Rewards, Turn, MODERATOR};
