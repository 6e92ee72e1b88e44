use crate::config::{describe_format, vote_format, SpyfallConfig};
use crate::vote::extract_vote;
use arena_core::text::fill_template;
use arena_core::{
    ends_conversation, zero_rewards, Action, Disposition, EndingReason, EnvError, Environment,
    Expect, Message, MessageKind, MessagePool, Metrics, Rewards, TimeStep, Turn, Visibility,
};
use rand::seq::{IteratorRandom, SliceRandom};
use rand::RngCore;
use std::collections::BTreeMap;

const SPEECH: Expect = Expect::utterance("arguments");

/// Smallest roster a game can be created with, whatever the config says.
pub const MIN_ROSTER: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Describe,
    Accuse,
}

/// Social deduction: villagers share a word, the spy holds a related one,
/// and everybody describes theirs until the spy is voted out or the table
/// gets too small.
pub struct Spyfall {
    config: SpyfallConfig,
    players: Vec<String>,
    active: Vec<String>,
    pool: MessagePool,
    topic: String,
    spy: String,
    spy_word: String,
    villager_word: String,
    phase: Phase,
    next_idx: usize,
    turn: Turn,
    votes: BTreeMap<String, u32>,
    terminal: bool,
    ending: Option<EndingReason>,
    eliminated: Vec<String>,
}

impl Spyfall {
    /// Build the environment and run its first reset.
    pub fn new(
        players: Vec<String>,
        config: SpyfallConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self, EnvError> {
        // `min_players` bounds the opening roster too.
        let minimum = config.min_players.max(MIN_ROSTER);
        if players.len() < minimum {
            return Err(EnvError::RosterSize {
                game: "spyfall",
                expected: format!("at least {minimum}"),
                got: players.len(),
            });
        }
        for (i, name) in players.iter().enumerate() {
            if players[..i].contains(name) {
                return Err(EnvError::DuplicatePlayer(name.clone()));
            }
        }
        if config.topic_codes.is_empty() {
            return Err(EnvError::EmptyTable("topic"));
        }

        let mut env = Self {
            config,
            active: players.clone(),
            players,
            pool: MessagePool::new(),
            topic: String::new(),
            spy: String::new(),
            spy_word: String::new(),
            villager_word: String::new(),
            phase: Phase::Describe,
            next_idx: 0,
            turn: 0,
            votes: BTreeMap::new(),
            terminal: false,
            ending: None,
            eliminated: Vec::new(),
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

    pub fn spy(&self) -> &str {
        &self.spy
    }

    /// Participants still in the game, in speaking order.
    pub fn active(&self) -> &[String] {
        &self.active
    }

    /// Votes collected in the current accusation round.
    pub fn votes(&self) -> &BTreeMap<String, u32> {
        &self.votes
    }

    pub fn ending(&self) -> Option<EndingReason> {
        self.ending
    }

    /// Winners get 1, losers 0, over the full roster.
    pub fn rewards(&self, spy_win: bool) -> Rewards {
        self.players
            .iter()
            .map(|name| {
                let won = (*name == self.spy) == spy_win;
                (name.clone(), if won { 1.0 } else { 0.0 })
            })
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

    fn reset_votes(&mut self) {
        self.votes = self.active.iter().map(|name| (name.clone(), 0)).collect();
    }

    fn announce_describe(&mut self) {
        let first = self.active.first().cloned().unwrap_or_default();
        let text = format!(
            "{} {}",
            fill_template(&self.config.prompts.describe, &[("player", first.as_str())]),
            describe_format(self.config.format)
        );
        self.moderator_say(text, Visibility::All);
    }

    fn finish(&mut self, reason: EndingReason) {
        self.terminal = true;
        self.ending = Some(reason);
        tracing::info!(ending = %reason, turn = self.turn, spy = %self.spy, "spyfall finished");
    }

    fn abort(&mut self, reason: EndingReason, raw: &str) -> TimeStep {
        let kind = match reason {
            EndingReason::ChatError => MessageKind::EndOfConversation,
            _ => MessageKind::Moderator,
        };
        self.pool.append(
            Message::moderator(format!("[Final Message] {raw}"), self.turn).with_kind(kind),
        );
        self.finish(reason);
        self.timestep(zero_rewards(&self.players))
    }

    /// Move to the next speaker; true when the round is complete.
    fn advance(&mut self) -> bool {
        if self.next_idx + 1 < self.active.len() {
            self.next_idx += 1;
            false
        } else {
            self.next_idx = 0;
            true
        }
    }

    fn describe(&mut self, player: &str, content: String) -> TimeStep {
        self.pool.append(Message::new(player, content, self.turn));
        self.turn += 1;

        if self.advance() {
            self.phase = Phase::Accuse;
            let text = format!(
                "{} {}",
                self.config.prompts.vote,
                vote_format(self.config.format)
            );
            self.moderator_say(text, Visibility::All);
            self.turn += 1;
        }
        self.timestep(zero_rewards(&self.players))
    }

    fn accuse(&mut self, player: &str, content: String) -> TimeStep {
        let vote = extract_vote(&content, &self.active, player).map(str::to_owned);
        self.pool.append(Message::new(player, content, self.turn));

        match &vote {
            Some(target) => *self.votes.entry(target.clone()).or_insert(0) += 1,
            None => tracing::debug!(%player, "no vote found in accusation"),
        }

        if !self.advance() {
            return self.timestep(zero_rewards(&self.players));
        }

        let rewards = self.tally();
        self.turn += 1;
        self.timestep(rewards)
    }

    /// Resolve a finished accusation round.
    fn tally(&mut self) -> Rewards {
        let top = self.votes.values().copied().max().unwrap_or(0);
        let leaders: Vec<String> = self
            .votes
            .iter()
            .filter(|(_, count)| top > 0 && **count == top)
            .map(|(name, _)| name.clone())
            .collect();
        tracing::debug!(votes = ?self.votes, "accusation round over");

        match leaders.as_slice() {
            [leader] if *leader == self.spy => {
                let text = fill_template(
                    &self.config.prompts.correct_accusation,
                    &[("player", leader.as_str())],
                );
                self.moderator_say(text, Visibility::All);
                self.finish(EndingReason::VillagersWin);
                return self.rewards(false);
            }
            [leader] => {
                let text = fill_template(
                    &self.config.prompts.wrong_accusation,
                    &[("player", leader.as_str())],
                );
                self.moderator_say(text, Visibility::All);
                self.active.retain(|name| name != leader);
                tracing::info!(player = %leader, remaining = self.active.len(), "player voted out");
                self.eliminated.push(leader.clone());
            }
            _ => {
                let text = self.config.prompts.even_vote.clone();
                self.moderator_say(text, Visibility::All);
            }
        }

        self.phase = Phase::Describe;
        self.next_idx = 0;
        self.reset_votes();

        if self.active.len() < self.config.min_players {
            let text = fill_template(
                &self.config.prompts.outlier_survived,
                &[("player", self.spy.as_str())],
            );
            self.moderator_say(text, Visibility::All);
            self.finish(EndingReason::OutlierWin);
            return self.rewards(true);
        }

        self.announce_describe();
        zero_rewards(&self.players)
    }
}

impl Environment for Spyfall {
    fn name(&self) -> &'static str {
        "spyfall"
    }

    fn players(&self) -> &[String] {
        &self.players
    }

    fn reset(&mut self, rng: &mut dyn RngCore) -> TimeStep {
        if let Some((topic, [spy_word, villager_word])) = self.config.topic_codes.iter().choose(rng)
        {
            self.topic = topic.clone();
            self.spy_word = spy_word.clone();
            self.villager_word = villager_word.clone();
        }
        self.spy = self.players.choose(rng).cloned().unwrap_or_default();

        self.active = self.players.clone();
        self.phase = Phase::Describe;
        self.next_idx = 0;
        self.turn = 0;
        self.terminal = false;
        self.ending = None;
        self.eliminated.clear();
        self.reset_votes();
        self.pool.clear();

        let prompts = self.config.prompts.clone();
        let villagers = Visibility::group(self.players.iter().filter(|p| **p != self.spy).cloned());

        self.moderator_say(prompts.game_start, Visibility::All);
        self.moderator_say(
            fill_template(&prompts.your_word, &[("word", self.villager_word.as_str())]),
            villagers,
        );
        self.moderator_say(
            fill_template(&prompts.your_word, &[("word", self.spy_word.as_str())]),
            Visibility::only(self.spy.clone()),
        );
        self.announce_describe();
        self.turn = 1;

        tracing::info!(
            players = self.players.len(),
            topic = %self.topic,
            format = %self.config.format,
            "spyfall reset"
        );

        self.timestep(zero_rewards(&self.players))
    }

    fn next_player(&self) -> &str {
        self.active
            .get(self.next_idx)
            .map(String::as_str)
            .unwrap_or_default()
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

        let content = match self.config.format.parse(&action.text, SPEECH) {
            Ok(parsed) => parsed.content,
            Err(err) => {
                tracing::debug!(%player, %err, "unparseable action");
                return Ok(self.abort(EndingReason::ParseError, &action.text));
            }
        };

        let timestep = match self.phase {
            Phase::Describe => self.describe(player, content),
            Phase::Accuse => self.accuse(player, content),
        };
        tracing::debug!(%player, turn = self.turn, phase = ?self.phase, "spyfall step");
        Ok(timestep)
    }

    fn pool(&self) -> &MessagePool {
        &self.pool
    }

    fn is_terminal(&self) -> bool {
        self.terminal || ends_conversation(&self.pool)
    }

    fn metrics(&self) -> Metrics {
        Metrics::new(self.turn, self.ending)
            .with_detail("eliminated", self.eliminated.clone())
            .with_detail("active", self.active.len())
    }

    fn disposition(&self) -> Disposition {
        let mut disposition = Disposition {
            secret: self.villager_word.clone(),
            players: self.players.len(),
            ..Disposition::default()
        };
        disposition
            .roles
            .insert("spy".into(), vec![self.spy.clone()]);
        disposition.roles.insert(
            "villager".into(),
            self.players
                .iter()
                .filter(|p| **p != self.spy)
                .cloned()
                .collect(),
        );
        disposition
            .details
            .insert("topic".into(), self.topic.clone().into());
        disposition
            .details
            .insert("spy_word".into(), self.spy_word.clone().into());
        disposition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster(n: usize) -> Vec<String> {
        ["Amy", "Jack", "Nancy", "Cindy", "Paul", "Rose"][..n]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn game(n: usize) -> Spyfall {
        let mut rng = StdRng::seed_from_u64(3);
        Spyfall::new(roster(n), SpyfallConfig::default(), &mut rng).unwrap()
    }

    fn say(text: &str) -> Action {
        Action::new(format!(r#"{{"arguments": "{text}"}}"#))
    }

    fn describe_round(env: &mut Spyfall) {
        for name in env.active().to_vec() {
            env.step(&name, say("it is something you can see")).unwrap();
        }
        assert_eq!(env.phase(), Phase::Accuse);
    }

    /// Every active player votes for `target`; `target` votes for `fallback`.
    fn vote_round(env: &mut Spyfall, target: &str, fallback: &str) -> TimeStep {
        let mut last = None;
        for name in env.active().to_vec() {
            let choice = if name == target { fallback } else { target };
            last = Some(env.step(&name, say(&format!("I vote *{choice}*"))).unwrap());
        }
        last.unwrap()
    }

    fn villager(env: &Spyfall, skip: &[&str]) -> String {
        env.active()
            .iter()
            .find(|p| p.as_str() != env.spy() && !skip.contains(&p.as_str()))
            .cloned()
            .unwrap()
    }

    #[test]
    fn first_speaker_is_first_in_roster() {
        let env = game(4);
        assert_eq!(env.next_player(), "Amy");
        assert_eq!(env.phase(), Phase::Describe);
        assert_eq!(env.turn(), 1);
    }

    #[test]
    fn words_are_private() {
        let env = game(4);
        let disposition = env.disposition();
        let spy_word = disposition.details["spy_word"].as_str().unwrap().to_owned();
        let villager = villager(&env, &[]);

        let seen = |player: &str, word: &str| {
            env.observation(Some(player))
                .iter()
                .any(|m| m.content().contains(&format!("Your word is: {word}.")))
        };
        assert!(seen(env.spy(), &spy_word));
        assert!(!seen(env.spy(), &disposition.secret));
        assert!(seen(&villager, &disposition.secret));
        assert!(!seen(&villager, &spy_word));
    }

    #[test]
    fn describe_is_round_robin_then_vote() {
        let mut env = game(4);
        for expected in ["Amy", "Jack", "Nancy"] {
            assert_eq!(env.next_player(), expected);
            env.step(expected, say("round")).unwrap();
            assert_eq!(env.phase(), Phase::Describe);
        }
        env.step("Cindy", say("round")).unwrap();
        assert_eq!(env.phase(), Phase::Accuse);
        assert_eq!(env.next_player(), "Amy");
    }

    #[test]
    fn unanimous_vote_on_spy_ends_for_villagers() {
        let mut env = game(6);
        let spy = env.spy().to_owned();
        let someone = villager(&env, &[]);

        describe_round(&mut env);
        let ts = vote_round(&mut env, &spy, &someone);

        assert!(ts.terminal);
        assert_eq!(env.ending(), Some(EndingReason::VillagersWin));
        for name in env.players() {
            let expected = if *name == spy { 0.0 } else { 1.0 };
            assert_eq!(ts.rewards[name], expected, "{name}");
        }
    }

    #[test]
    fn even_vote_removes_nobody() {
        let mut env = game(4);
        describe_round(&mut env);

        let pairs = [("Amy", "Jack"), ("Jack", "Amy"), ("Nancy", "Cindy"), ("Cindy", "Nancy")];
        let mut last = None;
        for (voter, target) in pairs {
            last = Some(env.step(voter, say(&format!("*{target}*"))).unwrap());
        }

        let ts = last.unwrap();
        assert!(!ts.terminal);
        assert_eq!(env.active().len(), 4);
        assert_eq!(env.phase(), Phase::Describe);
        assert_eq!(env.next_player(), "Amy");
        assert!(env.votes().values().all(|v| *v == 0));
    }

    #[test]
    fn wrong_accusation_eliminates_until_spy_wins() {
        let mut env = game(5);
        let spy = env.spy().to_owned();

        let first = villager(&env, &[]);
        describe_round(&mut env);
        let ts = vote_round(&mut env, &first, &spy);
        assert!(!ts.terminal);
        assert_eq!(env.active().len(), 4);
        assert!(!env.active().contains(&first));
        assert_eq!(env.players().len(), 5);
        assert_eq!(env.phase(), Phase::Describe);

        let second = villager(&env, &[]);
        describe_round(&mut env);
        let ts = vote_round(&mut env, &second, &spy);
        assert!(ts.terminal);
        assert_eq!(env.ending(), Some(EndingReason::OutlierWin));
        assert_eq!(ts.rewards[&spy], 1.0);
        assert_eq!(ts.rewards[&first], 0.0);
        let metrics = env.metrics();
        assert_eq!(metrics.details["eliminated"][0], first.as_str());
        assert_eq!(metrics.details["eliminated"][1], second.as_str());
        assert_eq!(metrics.details["active"], 3);
    }

    #[test]
    fn eliminated_players_do_not_speak() {
        let mut env = game(5);
        let spy = env.spy().to_owned();
        let out = villager(&env, &[]);

        describe_round(&mut env);
        vote_round(&mut env, &out, &spy);

        for _ in 0..env.active().len() {
            assert_ne!(env.next_player(), out);
            let next = env.next_player().to_owned();
            env.step(&next, say("again")).unwrap();
        }
        assert_eq!(
            env.step(&out, say("let me in")).unwrap_err(),
            EnvError::WrongPlayer {
                expected: env.next_player().to_owned(),
                got: out.clone(),
            }
        );
    }

    #[test]
    fn unparseable_and_abandoned_actions_end_the_game() {
        let mut env = game(4);
        let ts = env.step("Amy", Action::new("no json here")).unwrap();
        assert!(ts.terminal);
        assert_eq!(env.metrics().ending, EndingReason::ParseError);

        let mut env = game(4);
        let ts = env
            .step("Amy", Action::end_of_conversation("connection lost"))
            .unwrap();
        assert!(ts.terminal);
        assert_eq!(env.metrics().ending, EndingReason::ChatError);
    }

    #[test]
    fn roster_and_table_checks() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Spyfall::new(roster(2), SpyfallConfig::default(), &mut rng).err(),
            Some(EnvError::RosterSize { got: 2, .. })
        ));

        let mut players = roster(3);
        players.push("Amy".into());
        assert_eq!(
            Spyfall::new(players, SpyfallConfig::default(), &mut rng).err(),
            Some(EnvError::DuplicatePlayer("Amy".into()))
        );

        let config = SpyfallConfig {
            topic_codes: BTreeMap::new(),
            ..SpyfallConfig::default()
        };
        assert_eq!(
            Spyfall::new(roster(4), config, &mut rng).err(),
            Some(EnvError::EmptyTable("topic"))
        );
    }

    #[test]
    fn roster_must_reach_min_players() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            Spyfall::new(roster(3), SpyfallConfig::default(), &mut rng).err(),
            Some(EnvError::RosterSize { got: 3, .. })
        ));

        let config = SpyfallConfig {
            min_players: 3,
            ..SpyfallConfig::default()
        };
        let mut env = Spyfall::new(roster(3), config, &mut rng).unwrap();
        describe_round(&mut env);
        let names = env.active().to_vec();
        let mut last = None;
        for (voter, target) in names.iter().zip(names.iter().cycle().skip(1)) {
            last = Some(env.step(voter, say(&format!("*{target}*"))).unwrap());
        }

        let ts = last.unwrap();
        assert!(!ts.terminal);
        assert_eq!(env.active().len(), 3);
        assert_eq!(env.phase(), Phase::Describe);
    }
}
