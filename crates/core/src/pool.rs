use crate::message::Message;
use crate::types::Turn;

/// Append-only log of the messages of one episode.
///
/// Messages arrive in non-decreasing turn order; retrieval is either the full
/// history or the slice a given participant is allowed to see.
#[derive(Clone, Debug, Default)]
pub struct MessagePool {
    messages: Vec<Message>,
}

impl MessagePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message at the end of the log.
    pub fn append(&mut self, message: Message) {
        debug_assert!(
            self.messages
                .last()
                .map_or(true, |last| last.turn() <= message.turn()),
            "message turn {} goes back in time",
            message.turn()
        );
        self.messages.push(message);
    }

    /// Drop every message. Used when an environment resets.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Full ordered history, without visibility filtering.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// Messages `player` may see whose turn is at most `turn`.
    pub fn visible(&self, player: &str, turn: Turn) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|m| m.turn() <= turn && m.is_visible_to(player))
            .cloned()
            .collect()
    }

    /// Most recent message, `None` when nothing was appended yet.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Visibility;

    fn sample_pool() -> MessagePool {
        let mut pool = MessagePool::new();
        pool.append(Message::moderator("rules", 0));
        pool.append(
            Message::moderator("your word is melon", 0).visible_to(Visibility::only("Amy")),
        );
        pool.append(
            Message::moderator("your word is watermelon", 0)
                .visible_to(Visibility::group(["Jack", "Nancy"])),
        );
        pool.append(Message::new("Amy", "it is juicy", 1));
        pool.append(Message::new("Jack", "whisper", 2).visible_to(Visibility::only("Nancy")));
        pool.append(Message::new("Nancy", "it is green", 3));
        pool
    }

    #[test]
    fn test_all_returns_everything_in_order() {
        let pool = sample_pool();
        let turns: Vec<Turn> = pool.all().iter().map(Message::turn).collect();
        assert_eq!(turns, vec![0, 0, 0, 1, 2, 3]);
        assert_eq!(pool.len(), 6);
    }

    #[test]
    fn test_visible_matches_filter_for_every_player_and_cutoff() {
        let pool = sample_pool();
        for player in ["Amy", "Jack", "Nancy", "Outsider"] {
            for cutoff in 0..=4 {
                let expected: Vec<&Message> = pool
                    .all()
                    .iter()
                    .filter(|m| m.turn() <= cutoff && m.visibility().includes(player))
                    .collect();
                let visible = pool.visible(player, cutoff);
                assert_eq!(visible.len(), expected.len(), "{player} at {cutoff}");
                for (got, want) in visible.iter().zip(expected) {
                    assert_eq!(got, want);
                    assert!(got.turn() <= cutoff);
                }
            }
        }
    }

    #[test]
    fn test_private_messages_stay_private() {
        let pool = sample_pool();
        let amy = pool.visible("Amy", 10);
        assert!(amy.iter().any(|m| m.content() == "your word is melon"));
        assert!(!amy.iter().any(|m| m.content() == "your word is watermelon"));
        assert!(!amy.iter().any(|m| m.content() == "whisper"));

        let nancy = pool.visible("Nancy", 10);
        assert!(nancy.iter().any(|m| m.content() == "whisper"));
    }

    #[test]
    fn test_turn_cutoff_hides_later_messages() {
        let pool = sample_pool();
        let nancy = pool.visible("Nancy", 1);
        assert!(nancy.iter().all(|m| m.turn() <= 1));
        assert!(!nancy.iter().any(|m| m.content() == "whisper"));
    }

    #[test]
    fn test_empty_pool() {
        let mut pool = MessagePool::new();
        assert!(pool.last().is_none());
        assert!(pool.is_empty());

        pool.append(Message::new("Paya", "hello", 1));
        assert_eq!(pool.last().map(Message::content), Some("hello"));

        pool.clear();
        assert!(pool.last().is_none());
    }
}
