use arena_core::{Message, MessageHash};

/// Remembers the last message a stateful producer consumed, so each call
/// only forwards what was said since.
///
/// Chat backends that keep their own conversation state want deltas, not
/// the whole observation every turn.
#[derive(Debug, Clone, Default)]
pub struct HistoryCursor {
    last_seen: Option<MessageHash>,
}

impl HistoryCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages of `observation` after the last one returned, and advance.
    ///
    /// When the remembered message is no longer in the observation (a new
    /// episode started), everything is returned.
    pub fn unseen<'a>(&mut self, observation: &'a [Message]) -> &'a [Message] {
        let start = self
            .last_seen
            .as_ref()
            .and_then(|hash| observation.iter().rposition(|m| m.hash() == hash))
            .map_or(0, |idx| idx + 1);

        if let Some(last) = observation.last() {
            self.last_seen = Some(last.hash().clone());
        }
        &observation[start..]
    }

    pub fn last_seen(&self) -> Option<&MessageHash> {
        self.last_seen.as_ref()
    }

    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}
