use std::collections::BTreeMap;

/// Turn counter owned by an environment. Messages are stamped with it.
pub type Turn = u32;

/// Per-participant scalar reward, keyed by participant name.
pub type Rewards = BTreeMap<String, f64>;

/// Author name used for every message the environment emits itself.
pub const MODERATOR: &str = "Moderator";

/// A reward map giving every listed participant zero.
pub fn zero_rewards<S: AsRef<str>>(players: &[S]) -> Rewards {
    players
        .iter()
        .map(|name| (name.as_ref().to_owned(), 0.0))
        .collect()
}
