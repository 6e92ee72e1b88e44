use crate::envelope::Action;
use crate::error::EnvError;
use crate::message::{Message, MessageKind};
use crate::outcome::{Disposition, Metrics};
use crate::pool::MessagePool;
use crate::types::Rewards;
use rand::RngCore;

/// What an environment hands back after a reset or a step.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeStep {
    pub observation: Vec<Message>,
    pub rewards: Rewards,
    pub terminal: bool,
}

/// Turn-based game state machine driven by the arena.
///
/// `step` is the only method that mutates game state. Malformed actions are
/// resolved inside `step` as terminal endings; only contract violations such
/// as an out-of-turn actor come back as errors.
pub trait Environment {
    /// Short identifier of the game.
    fn name(&self) -> &'static str;

    /// Full participant roster, in seating order.
    fn players(&self) -> &[String];

    /// Start a new episode, drawing every hidden secret from `rng`.
    fn reset(&mut self, rng: &mut dyn RngCore) -> TimeStep;

    /// Participant expected to act next.
    fn next_player(&self) -> &str;

    /// Messages visible to `player` up to the current turn, or the whole
    /// history when `player` is `None`.
    fn observation(&self, player: Option<&str>) -> Vec<Message>;

    /// Structural pre-check used by the arena retry loop. Must not mutate.
    fn check_action(&self, action: &Action, _player: &str) -> bool {
        !action.is_blank()
    }

    /// Apply `action` by `player` and advance the state machine.
    fn step(&mut self, player: &str, action: Action) -> Result<TimeStep, EnvError>;

    /// Conversation log of the current episode.
    fn pool(&self) -> &MessagePool;

    /// True once the episode is over, including when the last record is an
    /// end-of-conversation signal.
    fn is_terminal(&self) -> bool {
        ends_conversation(self.pool())
    }

    fn metrics(&self) -> Metrics;

    fn disposition(&self) -> Disposition;
}

/// Whether the last message of `pool` closes the conversation.
pub fn ends_conversation(pool: &MessagePool) -> bool {
    pool.last()
        .is_some_and(|m| m.kind() == MessageKind::EndOfConversation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_is_not_terminal() {
        let mut pool = MessagePool::new();
        assert!(!ends_conversation(&pool));

        pool.append(Message::new("Paya", "hi", 1));
        assert!(!ends_conversation(&pool));

        pool.append(
            Message::moderator("[Final Message] bye", 1).with_kind(MessageKind::EndOfConversation),
        );
        assert!(ends_conversation(&pool));
    }
}
