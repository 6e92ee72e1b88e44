//! Buyer and seller haggle over a price until their offers cross.

pub mod config;
pub mod game;

pub use config::{BargainConfig, BargainPrompts, Item};
pub use game::{parse_price, Bargain};
