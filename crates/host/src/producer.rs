//! Sources of participant actions.
//!
//! The arena does not care whether an action comes from a language model, a
//! human or a fixture. Anything implementing [`ActionProducer`] can sit at
//! the table.

use crate::error::ProducerError;
use arena_core::{Action, Message};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

/// Everything a producer gets to see when asked for an action.
#[derive(Debug, Clone, Copy)]
pub struct ActionRequest<'a> {
    pub player: &'a str,
    pub role_desc: &'a str,
    /// Messages visible to `player` at the current turn.
    pub observation: &'a [Message],
}

pub trait ActionProducer {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError>;

    /// Forget per-episode state. Called on every arena reset.
    fn reset(&mut self) {}
}

impl<P: ActionProducer + ?Sized> ActionProducer for Box<P> {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        (**self).act(request)
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

/// A named seat at the table.
pub struct Participant {
    pub name: String,
    pub role_desc: String,
    pub producer: Box<dyn ActionProducer>,
}

impl Participant {
    pub fn new(
        name: impl Into<String>,
        role_desc: impl Into<String>,
        producer: impl ActionProducer + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            role_desc: role_desc.into(),
            producer: Box::new(producer),
        }
    }
}

/// Replays a fixed queue of actions, one per call.
///
/// The script is kept whole so `reset` can rewind it for the next episode.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProducer {
    script: Vec<Action>,
    queue: VecDeque<Action>,
}

impl ScriptedProducer {
    pub fn new<I, A>(actions: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Action>,
    {
        let script: Vec<Action> = actions.into_iter().map(Into::into).collect();
        Self {
            queue: script.iter().cloned().collect(),
            script,
        }
    }

    /// Actions not played yet.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl ActionProducer for ScriptedProducer {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        self.queue
            .pop_front()
            .ok_or_else(|| ProducerError::OutOfActions(request.player.to_owned()))
    }

    fn reset(&mut self) {
        self.queue = self.script.iter().cloned().collect();
    }
}

/// Wraps a producer and retries transient failures with exponential backoff.
///
/// The delay before retry `n` (counting from 1) is `base_delay * 2^(n-1)`,
/// scaled by a random factor in `[0.5, 1.5)` and capped at `max_delay`.
pub struct Retrying<P> {
    inner: P,
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl<P: ActionProducer> Retrying<P> {
    pub fn new(inner: P, max_attempts: u32) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn backoff(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = self
            .base_delay
            .saturating_mul(1u32 << retry.saturating_sub(1).min(16));
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        exp.mul_f64(jitter).min(self.max_delay)
    }
}

impl<P: ActionProducer> ActionProducer for Retrying<P> {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.act(request) {
                Ok(action) => return Ok(action),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        player = request.player,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "producer failed, retrying"
                    );
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                }
                Err(err) if err.is_transient() => {
                    return Err(ProducerError::Exhausted {
                        attempts: attempt,
                        last: err.to_string(),
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fails with a transport error `failures` times, then answers.
    struct Flaky {
        failures: u32,
        calls: u32,
    }

    impl ActionProducer for Flaky {
        fn act(&mut self, _request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
            self.calls += 1;
            if self.calls <= self.failures {
                Err(ProducerError::Transport("503".into()))
            } else {
                Ok(Action::new("ok"))
            }
        }
    }

    fn request() -> ActionRequest<'static> {
        ActionRequest {
            player: "Paya",
            role_desc: "",
            observation: &[],
        }
    }

    #[test]
    fn scripted_replays_and_rewinds() {
        let mut producer = ScriptedProducer::new(["one", "two"]);
        assert_eq!(producer.act(&request()).unwrap().text, "one");
        assert_eq!(producer.act(&request()).unwrap().text, "two");
        assert_eq!(
            producer.act(&request()),
            Err(ProducerError::OutOfActions("Paya".into()))
        );

        producer.reset();
        assert_eq!(producer.remaining(), 2);
        assert_eq!(producer.act(&request()).unwrap().text, "one");
    }

    #[test]
    fn retrying_recovers_from_transient_failures() {
        let mut producer = Retrying::new(Flaky { failures: 2, calls: 0 }, 3)
            .with_delays(Duration::ZERO, Duration::ZERO);
        assert_eq!(producer.act(&request()).unwrap().text, "ok");
        assert_eq!(producer.inner().calls, 3);
    }

    #[test]
    fn retrying_gives_up_at_the_ceiling() {
        let mut producer = Retrying::new(Flaky { failures: 5, calls: 0 }, 2)
            .with_delays(Duration::ZERO, Duration::ZERO);
        assert_eq!(
            producer.act(&request()),
            Err(ProducerError::Exhausted {
                attempts: 2,
                last: "transport failure: 503".into(),
            })
        );
        assert_eq!(producer.inner().calls, 2);
    }

    #[test]
    fn permanent_errors_are_not_retried() {
        let mut producer = Retrying::new(ScriptedProducer::default(), 4);
        assert!(matches!(
            producer.act(&request()),
            Err(ProducerError::OutOfActions(_))
        ));
    }

    #[test]
    fn backoff_grows_and_caps() {
        let producer = Retrying::new(ScriptedProducer::default(), 5)
            .with_delays(Duration::from_millis(100), Duration::from_millis(250));
        let first = producer.backoff(1);
        assert!(first >= Duration::from_millis(50) && first < Duration::from_millis(150));
        assert!(producer.backoff(10) <= Duration::from_millis(250));
    }
}
