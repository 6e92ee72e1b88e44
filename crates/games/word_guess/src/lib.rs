//! Cooperative word guessing: a speaker hints at a secret word, a guesser
//! tries to name it.

pub mod config;
pub mod game;

pub use config::{Reminder, WordGuessConfig, WordGuessPrompts};
pub use game::{Phase, WordGuess};
