//! Spyfall-style social deduction with describing and voting rounds.

pub mod config;
pub mod game;
pub mod vote;

pub use config::{SpyfallConfig, SpyfallPrompts};
pub use game::{Phase, Spyfall, MIN_ROSTER};
pub use vote::extract_vote;
