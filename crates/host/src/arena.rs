use crate::error::ArenaError;
use crate::producer::{ActionRequest, Participant};
use crate::transcript::{write_json, Transcript};
use arena_core::{Environment, Metrics, TimeStep};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

/// How often a participant may produce an unusable action before the run
/// is aborted.
pub const INVALID_ACTION_RETRY: u32 = 5;

/// Identifier of one episode, drawn from the arena RNG on every reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EpisodeId(pub u64);

impl fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Drives one environment with a set of participants, one action at a time.
pub struct Arena<E: Environment> {
    env: E,
    participants: Vec<Participant>,
    rng: StdRng,
    episode: EpisodeId,
    timestep: TimeStep,
    steps: u32,
    invalid_action_retry: u32,
}

impl<E: Environment> Arena<E> {
    /// Seat `participants` at `env` and start the first episode.
    ///
    /// Every roster name needs exactly one participant and every participant
    /// must be on the roster.
    pub fn new(env: E, participants: Vec<Participant>, seed: u64) -> Result<Self, ArenaError> {
        let mut seen = BTreeSet::new();
        for participant in &participants {
            if !seen.insert(participant.name.as_str()) {
                return Err(ArenaError::DuplicateParticipant(participant.name.clone()));
            }
            if !env.players().contains(&participant.name) {
                return Err(ArenaError::UnknownParticipant(participant.name.clone()));
            }
        }
        if let Some(missing) = env.players().iter().find(|p| !seen.contains(p.as_str())) {
            return Err(ArenaError::MissingParticipant(missing.clone()));
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let episode = EpisodeId(rng.next_u64());
        let mut arena = Self {
            timestep: TimeStep {
                observation: Vec::new(),
                rewards: Default::default(),
                terminal: false,
            },
            env,
            participants,
            rng,
            episode,
            steps: 0,
            invalid_action_retry: INVALID_ACTION_RETRY,
        };
        arena.reset();
        Ok(arena)
    }

    /// Change how many unusable actions are tolerated per step.
    pub fn with_invalid_action_retry(mut self, attempts: u32) -> Self {
        self.invalid_action_retry = attempts.max(1);
        self
    }

    /// Start a new episode: fresh environment state, fresh producers.
    pub fn reset(&mut self) -> &TimeStep {
        self.timestep = self.env.reset(&mut self.rng);
        for participant in &mut self.participants {
            participant.producer.reset();
        }
        self.episode = EpisodeId(self.rng.next_u64());
        self.steps = 0;
        tracing::info!(
            game = self.env.name(),
            episode = %self.episode,
            players = self.participants.len(),
            "episode started"
        );
        &self.timestep
    }

    /// Ask the next player for an action and apply it.
    ///
    /// The producer gets `invalid_action_retry` tries; an action failing the
    /// environment's pre-check and a producer error both use one up.
    pub fn step(&mut self) -> Result<TimeStep, ArenaError> {
        if self.env.is_terminal() {
            return Err(ArenaError::EpisodeFinished);
        }

        let player = self.env.next_player().to_owned();
        let observation = self.env.observation(Some(&player));
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.name == player)
            .ok_or_else(|| ArenaError::MissingParticipant(player.clone()))?;
        let request = ActionRequest {
            player: &player,
            role_desc: &participant.role_desc,
            observation: &observation,
        };

        for attempt in 1..=self.invalid_action_retry {
            match participant.producer.act(&request) {
                Ok(action) if self.env.check_action(&action, &player) => {
                    let timestep = self.env.step(&player, action)?;
                    self.steps += 1;
                    tracing::debug!(
                        %player,
                        step = self.steps,
                        attempt,
                        terminal = timestep.terminal,
                        "step applied"
                    );
                    if timestep.terminal {
                        let metrics = self.env.metrics();
                        tracing::info!(
                            episode = %self.episode,
                            ending = %metrics.ending,
                            turns = metrics.turns,
                            "episode finished"
                        );
                    }
                    self.timestep = timestep.clone();
                    return Ok(timestep);
                }
                Ok(action) => {
                    tracing::warn!(%player, attempt, text = %action.text, "invalid action");
                }
                Err(err) => {
                    tracing::warn!(%player, attempt, %err, "producer failed");
                }
            }
        }

        Err(ArenaError::TooManyInvalidActions {
            player,
            attempts: self.invalid_action_retry,
        })
    }

    /// Step until the episode ends or `num_steps` steps were taken.
    pub fn run(&mut self, num_steps: u32) -> Result<TimeStep, ArenaError> {
        for _ in 0..num_steps {
            if self.env.is_terminal() {
                break;
            }
            self.step()?;
        }
        Ok(self.timestep.clone())
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn episode(&self) -> EpisodeId {
        self.episode
    }

    /// Steps applied in the current episode.
    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn is_terminal(&self) -> bool {
        self.env.is_terminal()
    }

    /// Most recent result of a reset or step.
    pub fn last_timestep(&self) -> &TimeStep {
        &self.timestep
    }

    pub fn metrics(&self) -> Metrics {
        self.env.metrics()
    }

    pub fn transcript(&self) -> Transcript {
        Transcript {
            episode: self.episode,
            game: self.env.name().to_owned(),
            players: self.env.players().to_vec(),
            disposition: self.env.disposition(),
            metrics: self.env.metrics(),
            messages: self.env.pool().all().to_vec(),
            exported_at: Utc::now(),
        }
    }

    /// Write the full transcript, visibility included.
    pub fn save_history(&self, path: impl AsRef<Path>) -> Result<(), ArenaError> {
        write_json(path.as_ref(), &self.transcript())
    }

    /// Write the plain conversation.
    pub fn save_chat(&self, path: impl AsRef<Path>) -> Result<(), ArenaError> {
        write_json(path.as_ref(), &self.transcript().chat())
    }
}
