use crate::config::{guesser_format, speaker_format, Reminder, WordGuessConfig};
use arena_core::text::{contains_ignore_case, fill_template, same_word};
use arena_core::{
    ends_conversation, zero_rewards, Action, Disposition, EndingReason, EnvError, Environment,
    Expect, Message, MessageKind, MessagePool, Metrics, Rewards, TimeStep, Turn, Visibility,
};
use rand::seq::SliceRandom;
use rand::RngCore;

const CLUE: Expect = Expect::utterance("clue");
const GUESS: Expect = Expect::answer("guess", "arguments");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    GiveClue,
    Guess,
}

/// Two-player word guessing: the speaker hints, the guesser guesses.
pub struct WordGuess {
    config: WordGuessConfig,
    players: Vec<String>,
    pool: MessagePool,
    word: String,
    restricted: Vec<String>,
    speaker: String,
    guesser: String,
    phase: Phase,
    turn: Turn,
    terminal: bool,
    ending: Option<EndingReason>,
    leaked: Option<String>,
    guesses: Vec<String>,
}

impl WordGuess {
    /// Build the environment and run its first reset.
    pub fn new(
        players: Vec<String>,
        config: WordGuessConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self, EnvError> {
        if players.len() != 2 {
            return Err(EnvError::RosterSize {
                game: "word-guess",
                expected: "exactly 2".into(),
                got: players.len(),
            });
        }
        if players[0] == players[1] {
            return Err(EnvError::DuplicatePlayer(players[0].clone()));
        }
        if config.candidates().is_empty() {
            return Err(EnvError::EmptyTable("word"));
        }

        let mut env = Self {
            config,
            players,
            pool: MessagePool::new(),
            word: String::new(),
            restricted: Vec::new(),
            speaker: String::new(),
            guesser: String::new(),
            phase: Phase::GiveClue,
            turn: 0,
            terminal: false,
            ending: None,
            leaked: None,
            guesses: Vec::new(),
        };
        env.reset(rng);
        Ok(env)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    pub fn secret_word(&self) -> &str {
        &self.word
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn guesser(&self) -> &str {
        &self.guesser
    }

    pub fn ending(&self) -> Option<EndingReason> {
        self.ending
    }

    /// Guesses made so far this episode, as answered.
    pub fn guesses(&self) -> &[String] {
        &self.guesses
    }

    /// Both players share the outcome: one point each on a correct guess.
    pub fn rewards(&self, correct_guess: bool) -> Rewards {
        let reward = if correct_guess { 1.0 } else { 0.0 };
        self.players
            .iter()
            .map(|name| (name.clone(), reward))
            .collect()
    }

    fn moderator_say(&mut self, text: String, visibility: Visibility) {
        self.pool
            .append(Message::moderator(text, self.turn).visible_to(visibility));
    }

    fn timestep(&self, rewards: Rewards) -> TimeStep {
        TimeStep {
            observation: self.observation(None),
            rewards,
            terminal: self.is_terminal(),
        }
    }

    /// End the episode on an action that cannot be played.
    fn abort(&mut self, reason: EndingReason, raw: &str) -> TimeStep {
        let kind = match reason {
            EndingReason::ChatError => MessageKind::EndOfConversation,
            _ => MessageKind::Moderator,
        };
        self.pool.append(
            Message::moderator(format!("[Final Message] {raw}"), self.turn).with_kind(kind),
        );
        self.terminal = true;
        self.ending = Some(reason);
        tracing::info!(ending = %reason, turn = self.turn, "word guess aborted");
        self.timestep(zero_rewards(&self.players))
    }

    /// The secret word, or an enforced restricted term, found in `clue`.
    ///
    /// Any case-insensitive substring counts, so inflected forms such as
    /// "bananas" leak "banana", and so does a longer word like "hamster"
    /// for "ham".
    fn leaked_term(&self, clue: &str) -> Option<String> {
        if contains_ignore_case(clue, &self.word) {
            return Some(self.word.clone());
        }
        if !self.config.enforce_taboo {
            return None;
        }
        self.restricted
            .iter()
            .find(|term| contains_ignore_case(clue, term))
            .cloned()
    }

    fn give_clue(&mut self, player: &str, action: &Action) -> TimeStep {
        let clue = match self.config.format.parse(&action.text, CLUE) {
            Ok(parsed) => parsed.content,
            Err(err) => {
                tracing::debug!(%player, %err, "unparseable clue");
                return self.abort(EndingReason::ParseError, &action.text);
            }
        };

        let leaked = self.leaked_term(&clue);
        self.pool.append(Message::new(player, clue, self.turn));

        if let Some(term) = leaked {
            let text = fill_template(&self.config.prompts.secret_leaked, &[("player", player)]);
            self.moderator_say(text, Visibility::All);
            self.terminal = true;
            self.ending = Some(EndingReason::SecretLeaked);
            tracing::info!(%player, %term, "secret leaked in clue");
            self.leaked = Some(term);
            return self.timestep(zero_rewards(&self.players));
        }

        self.turn += 1;
        self.phase = Phase::Guess;

        if self.config.reminder == Reminder::Format {
            let text = guesser_format(self.config.format).to_owned();
            self.moderator_say(text, Visibility::only(self.guesser.clone()));
        }

        self.timestep(zero_rewards(&self.players))
    }

    fn guess(&mut self, player: &str, action: &Action) -> TimeStep {
        let parsed = match self.config.format.parse(&action.text, GUESS) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::debug!(%player, %err, "unparseable guess");
                return self.abort(EndingReason::ParseError, &action.text);
            }
        };
        let guess = parsed.answer.unwrap_or_default();

        self.pool.append(Message::new(player, parsed.content, self.turn));
        self.guesses.push(guess.clone());

        let correct = same_word(&guess, &self.word);
        let vars = [
            ("player", player),
            ("word", self.word.as_str()),
            ("guess", guess.as_str()),
        ];
        let verdict = if correct {
            fill_template(&self.config.prompts.win, &vars)
        } else {
            fill_template(&self.config.prompts.wrong_guess, &vars)
        };
        self.moderator_say(verdict, Visibility::All);

        self.phase = Phase::GiveClue;
        if correct {
            self.terminal = true;
            self.ending = Some(EndingReason::Success);
            tracing::info!(%player, turn = self.turn, "word guessed");
            return self.timestep(self.rewards(true));
        }

        let speaker = Visibility::only(self.speaker.clone());
        match self.config.reminder {
            Reminder::None => {}
            Reminder::Format => {
                let text = speaker_format(self.config.format).to_owned();
                self.moderator_say(text, speaker);
            }
            Reminder::SecretWord => {
                let text = fill_template(
                    &self.config.prompts.word_reminder,
                    &[("word", self.word.as_str())],
                );
                self.moderator_say(text, speaker);
            }
        }

        self.timestep(self.rewards(false))
    }
}

impl Environment for WordGuess {
    fn name(&self) -> &'static str {
        "word-guess"
    }

    fn players(&self) -> &[String] {
        &self.players
    }

    fn reset(&mut self, rng: &mut dyn RngCore) -> TimeStep {
        let candidates = self.config.candidates();
        self.word = candidates
            .choose(rng)
            .map(|w| (*w).to_owned())
            .unwrap_or_default();
        self.restricted = self.config.restricted(&self.word).to_vec();

        let guesser_idx = if rng.next_u32() % 2 == 0 { 0 } else { 1 };
        self.guesser = self.players[guesser_idx].clone();
        self.speaker = self.players[1 - guesser_idx].clone();

        self.phase = Phase::GiveClue;
        self.turn = 0;
        self.terminal = false;
        self.ending = None;
        self.leaked = None;
        self.guesses.clear();
        self.pool.clear();

        let prompts = self.config.prompts.clone();
        let format = self.config.format;
        let speaker = Visibility::only(self.speaker.clone());
        let guesser = Visibility::only(self.guesser.clone());

        self.moderator_say(
            format!("{} {}", prompts.speaker_role, speaker_format(format)),
            speaker.clone(),
        );
        self.moderator_say(
            format!("{} {}", prompts.guesser_role, guesser_format(format)),
            guesser,
        );
        self.moderator_say(prompts.game_start, Visibility::All);

        let mut secret = fill_template(&prompts.secret_word, &[("word", self.word.as_str())]);
        if !self.restricted.is_empty() {
            let terms = self.restricted.join(", ");
            secret.push(' ');
            secret.push_str(&fill_template(&prompts.restricted_words, &[("terms", &terms)]));
        }
        self.moderator_say(secret, speaker);
        self.moderator_say(prompts.clue_phase, Visibility::All);
        self.turn = 1;

        tracing::info!(
            speaker = %self.speaker,
            guesser = %self.guesser,
            format = %self.config.format,
            "word guess reset"
        );

        self.timestep(zero_rewards(&self.players))
    }

    fn next_player(&self) -> &str {
        match self.phase {
            Phase::GiveClue => &self.speaker,
            Phase::Guess => &self.guesser,
        }
    }

    fn observation(&self, player: Option<&str>) -> Vec<Message> {
        match player {
            Some(player) => self.pool.visible(player, self.turn),
            None => self.pool.all().to_vec(),
        }
    }

    fn step(&mut self, player: &str, action: Action) -> Result<TimeStep, EnvError> {
        if self.is_terminal() {
            return Err(EnvError::Terminated);
        }
        if player != self.next_player() {
            return Err(EnvError::WrongPlayer {
                expected: self.next_player().to_owned(),
                got: player.to_owned(),
            });
        }

        if action.end_of_conversation {
            return Ok(self.abort(EndingReason::ChatError, &action.text));
        }

        let timestep = match self.phase {
            Phase::GiveClue => self.give_clue(player, &action),
            Phase::Guess => self.guess(player, &action),
        };
        tracing::debug!(%player, turn = self.turn, terminal = timestep.terminal, "word guess step");
        Ok(timestep)
    }

    fn pool(&self) -> &MessagePool {
        &self.pool
    }

    fn is_terminal(&self) -> bool {
        self.terminal || ends_conversation(&self.pool)
    }

    fn metrics(&self) -> Metrics {
        let mut metrics =
            Metrics::new(self.turn, self.ending).with_detail("guesses", self.guesses.len());
        if let Some(term) = &self.leaked {
            metrics = metrics.with_detail("leaked_term", term.as_str());
        }
        metrics
    }

    fn disposition(&self) -> Disposition {
        let mut disposition = Disposition {
            secret: self.word.clone(),
            players: self.players.len(),
            ..Disposition::default()
        };
        disposition
            .roles
            .insert("speaker".into(), vec![self.speaker.clone()]);
        disposition
            .roles
            .insert("guesser".into(), vec![self.guesser.clone()]);
        if !self.restricted.is_empty() {
            disposition
                .details
                .insert("restricted".into(), self.restricted.clone().into());
        }
        disposition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WordGuessConfig;
    use arena_core::{ResponseFormat, MODERATOR};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn players() -> Vec<String> {
        vec!["Paya".into(), "Toto".into()]
    }

    fn env_with(config: WordGuessConfig) -> WordGuess {
        let mut rng = StdRng::seed_from_u64(7);
        WordGuess::new(players(), config, &mut rng).unwrap()
    }

    fn banana_config(format: ResponseFormat) -> WordGuessConfig {
        WordGuessConfig {
            words: vec!["Banana".into()],
            format,
            ..WordGuessConfig::default()
        }
    }

    fn clue(text: &str) -> Action {
        Action::new(format!(r#"{{"clue": "{text}"}}"#))
    }

    fn guess(word: &str) -> Action {
        Action::new(format!(r#"{{"guess": "{word}", "arguments": "because"}}"#))
    }

    #[test]
    fn speaker_acts_first_after_reset() {
        let env = env_with(banana_config(ResponseFormat::Json));
        assert_eq!(env.phase(), Phase::GiveClue);
        assert_eq!(env.next_player(), env.speaker());
        assert_ne!(env.speaker(), env.guesser());
        assert_eq!(env.turn(), 1);
        assert!(!env.is_terminal());
    }

    #[test]
    fn secret_is_only_shown_to_speaker() {
        let env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.observation(Some(env.speaker()));
        let guesser = env.observation(Some(env.guesser()));
        assert!(speaker.iter().any(|m| m.content().contains("Banana")));
        assert!(!guesser.iter().any(|m| m.content().contains("Banana")));
    }

    #[test]
    fn correct_guess_wins_for_both() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        let ts = env.step(&speaker, clue("a long yellow fruit")).unwrap();
        assert!(!ts.terminal);
        assert_eq!(env.next_player(), guesser);

        let ts = env.step(&guesser, guess("BANANA.")).unwrap();
        assert!(ts.terminal);
        assert_eq!(ts.rewards[&speaker], 1.0);
        assert_eq!(ts.rewards[&guesser], 1.0);
        assert_eq!(env.metrics().ending, EndingReason::Success);
    }

    #[test]
    fn wrong_guess_starts_new_round() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        env.step(&speaker, clue("a yellow fruit")).unwrap();
        let ts = env.step(&guesser, guess("lemon")).unwrap();
        assert!(!ts.terminal);
        assert_eq!(ts.rewards[&guesser], 0.0);
        assert_eq!(env.phase(), Phase::GiveClue);
        assert_eq!(env.next_player(), speaker);
        assert_eq!(env.metrics().ending, EndingReason::RoundLimit);
        assert_eq!(env.turn(), 2);
    }

    #[test]
    fn clue_mentioning_secret_ends_episode() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();

        let ts = env.step(&speaker, clue("it is a Banana, obviously")).unwrap();
        assert!(ts.terminal);
        assert!(ts.rewards.values().all(|r| *r == 0.0));
        let metrics = env.metrics();
        assert_eq!(metrics.ending, EndingReason::SecretLeaked);
        assert_eq!(metrics.details["leaked_term"], "Banana");
    }

    #[test]
    fn secret_inside_a_longer_word_still_leaks() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();

        assert!(env.step(&speaker, clue("monkeys love BANANAS")).unwrap().terminal);
        assert_eq!(env.metrics().ending, EndingReason::SecretLeaked);
        assert_eq!(env.metrics().details["leaked_term"], "Banana");
    }

    #[test]
    fn restricted_terms_only_checked_when_enforced() {
        let config = WordGuessConfig {
            words: vec!["Beer ham".into()],
            ..WordGuessConfig::default()
        };
        let mut env = env_with(config.clone());
        let speaker = env.speaker().to_owned();
        assert!(!env.step(&speaker, clue("a sausage with alcohol")).unwrap().terminal);

        let mut env = env_with(WordGuessConfig {
            enforce_taboo: true,
            ..config
        });
        let speaker = env.speaker().to_owned();
        assert!(env.step(&speaker, clue("a sausage")).unwrap().terminal);
        assert_eq!(env.metrics().ending, EndingReason::SecretLeaked);
    }

    #[test]
    fn malformed_output_is_parse_error() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();

        let ts = env.step(&speaker, Action::new("I refuse to answer in JSON")).unwrap();
        assert!(ts.terminal);
        assert_eq!(env.metrics().ending, EndingReason::ParseError);
        assert_eq!(env.phase(), Phase::GiveClue);
        let last = env.pool().last().unwrap();
        assert!(last.content().starts_with("[Final Message]"));
    }

    #[test]
    fn end_of_conversation_is_chat_error() {
        let mut env = env_with(banana_config(ResponseFormat::Bracket));
        let speaker = env.speaker().to_owned();

        let ts = env
            .step(&speaker, Action::end_of_conversation("rate limited"))
            .unwrap();
        assert!(ts.terminal);
        assert!(env.is_terminal());
        assert_eq!(env.metrics().ending, EndingReason::ChatError);
        assert_eq!(env.pool().last().unwrap().kind(), MessageKind::EndOfConversation);
    }

    #[test]
    fn bracket_format_round() {
        let mut env = env_with(banana_config(ResponseFormat::Bracket));
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        env.step(&speaker, Action::new("Monkeys love it.")).unwrap();
        let ts = env
            .step(&guesser, Action::new("No brackets at all"))
            .unwrap();
        assert!(ts.terminal);
        assert_eq!(env.metrics().ending, EndingReason::ParseError);
    }

    #[test]
    fn sentence_format_accepts_short_first_sentence() {
        let mut env = env_with(banana_config(ResponseFormat::Sentence));
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        env.step(&speaker, Action::new("Monkeys love it.")).unwrap();
        let ts = env
            .step(&guesser, Action::new("Banana. Monkeys eat them."))
            .unwrap();
        assert!(ts.terminal);
        assert_eq!(env.metrics().ending, EndingReason::Success);
    }

    #[test]
    fn out_of_turn_is_contract_violation() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let guesser = env.guesser().to_owned();
        let err = env.step(&guesser, guess("banana")).unwrap_err();
        assert!(matches!(err, EnvError::WrongPlayer { .. }));
    }

    #[test]
    fn stepping_after_the_end_is_rejected() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();
        env.step(&speaker, Action::new("garbage")).unwrap();
        assert_eq!(
            env.step(&speaker, clue("again")).unwrap_err(),
            EnvError::Terminated
        );
    }

    #[test]
    fn reminders_target_next_actor() {
        let mut env = env_with(WordGuessConfig {
            reminder: Reminder::SecretWord,
            ..banana_config(ResponseFormat::Json)
        });
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        env.step(&speaker, clue("yellow")).unwrap();
        env.step(&guesser, guess("lemon")).unwrap();
        let last = env.pool().last().unwrap();
        assert!(last.content().contains("Banana"));
        assert!(!last.is_visible_to(&guesser));
    }

    #[test]
    fn format_reminders_follow_the_turn() {
        let mut env = env_with(WordGuessConfig {
            reminder: Reminder::Format,
            ..banana_config(ResponseFormat::Json)
        });
        let speaker = env.speaker().to_owned();
        let guesser = env.guesser().to_owned();

        env.step(&speaker, clue("yellow")).unwrap();
        let to_guesser = env.pool().last().unwrap();
        assert_eq!(to_guesser.author(), MODERATOR);
        assert_eq!(to_guesser.content(), guesser_format(ResponseFormat::Json));
        assert!(to_guesser.is_visible_to(&guesser));
        assert!(!to_guesser.is_visible_to(&speaker));

        env.step(&guesser, guess("lemon")).unwrap();
        let to_speaker = env.pool().last().unwrap();
        assert_eq!(to_speaker.author(), MODERATOR);
        assert_eq!(to_speaker.content(), speaker_format(ResponseFormat::Json));
        assert!(to_speaker.is_visible_to(&speaker));
        assert!(!to_speaker.is_visible_to(&guesser));
        assert!(!env.is_terminal());
    }

    #[test]
    fn reset_clears_episode() {
        let mut env = env_with(banana_config(ResponseFormat::Json));
        let speaker = env.speaker().to_owned();
        env.step(&speaker, Action::new("garbage")).unwrap();
        assert!(env.is_terminal());

        let mut rng = StdRng::seed_from_u64(99);
        let ts = env.reset(&mut rng);
        assert!(!ts.terminal);
        assert_eq!(env.ending(), None);
        assert_eq!(env.turn(), 1);
        assert!(env.guesses().is_empty());
    }

    #[test]
    fn roster_must_have_two_players() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = WordGuess::new(vec!["Solo".into()], WordGuessConfig::default(), &mut rng)
            .err()
            .unwrap();
        assert!(matches!(err, EnvError::RosterSize { got: 1, .. }));
    }

    #[test]
    fn disposition_lists_roles() {
        let env = env_with(banana_config(ResponseFormat::Json));
        let disposition = env.disposition();
        assert_eq!(disposition.secret, "Banana");
        assert_eq!(disposition.role_of(env.speaker()), Some("speaker"));
        assert_eq!(disposition.role_of(env.guesser()), Some("guesser"));
    }
}
