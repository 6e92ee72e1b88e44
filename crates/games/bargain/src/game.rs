use crate::config::{offer_format, BargainConfig, Item};
use arena_core::text::fill_template;
use arena_core::{
    ends_conversation, zero_rewards, Action, Disposition, EndingReason, EnvError, Environment,
    Expect, Message, MessageKind, MessagePool, Metrics, ParseError, Rewards, TimeStep, Turn,
    Visibility,
};
use rand::seq::SliceRandom;
use rand::RngCore;

const OFFER: Expect = Expect::answer("price", "arguments");

/// Read a price out of an answer such as `"42.5"`, `"$1,200"`, `".5"` or
/// `"I offer 50"`.
///
/// The first number in the text counts. A minus sign in front of it makes
/// the answer unusable, as does a number that does not parse.
pub fn parse_price(text: &str) -> Result<f64, ParseError> {
    let not_a_number = || ParseError::NotANumber(text.to_owned());
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let digit_at = |i: usize| cleaned[i..].starts_with(|c: char| c.is_ascii_digit());
    let start = cleaned
        .char_indices()
        .find(|&(i, c)| c.is_ascii_digit() || (c == '.' && digit_at(i + 1)))
        .map(|(i, _)| i)
        .ok_or_else(not_a_number)?;

    let mut before = cleaned[..start].chars().rev();
    let signed = before.next() == Some('-') && !before.next().is_some_and(char::is_alphanumeric);
    if signed {
        return Err(not_a_number());
    }

    let digits: String = cleaned[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits
        .trim_end_matches('.')
        .parse::<f64>()
        .map_err(|_| not_a_number())
}

/// Two-party price negotiation. The buyer is the first player and opens.
pub struct Bargain {
    config: BargainConfig,
    players: Vec<String>,
    pool: MessagePool,
    item: Item,
    turn: Turn,
    proposals: u32,
    buyer_offer: Option<f64>,
    seller_offer: Option<f64>,
    agreement: Option<f64>,
    terminal: bool,
    ending: Option<EndingReason>,
}

impl Bargain {
    /// Build the environment and run its first reset.
    pub fn new(
        players: Vec<String>,
        config: BargainConfig,
        rng: &mut dyn RngCore,
    ) -> Result<Self, EnvError> {
        if players.len() != 2 {
            return Err(EnvError::RosterSize {
                game: "bargain",
                expected: "exactly 2".into(),
                got: players.len(),
            });
        }
        if players[0] == players[1] {
            return Err(EnvError::DuplicatePlayer(players[0].clone()));
        }
        let item = config
            .items
            .first()
            .cloned()
            .ok_or(EnvError::EmptyTable("item"))?;

        let mut env = Self {
            config,
            players,
            pool: MessagePool::new(),
            item,
            turn: 0,
            proposals: 0,
            buyer_offer: None,
            seller_offer: None,
            agreement: None,
            terminal: false,
            ending: None,
        };
        env.reset(rng);
        Ok(env)
    }

    pub fn buyer(&self) -> &str {
        &self.players[0]
    }

    pub fn seller(&self) -> &str {
        &self.players[1]
    }

    pub fn item(&self) -> &Item {
        &self.item
    }

    pub fn turn(&self) -> Turn {
        self.turn
    }

    /// Agreed price, once a deal is struck.
    pub fn agreement(&self) -> Option<f64> {
        self.agreement
    }

    pub fn ending(&self) -> Option<EndingReason> {
        self.ending
    }

    /// Surplus of each side at `price`, or nothing for both without a deal.
    pub fn rewards(&self, price: Option<f64>) -> Rewards {
        match price {
            Some(price) => [
                (self.buyer().to_owned(), self.item.buyer_value - price),
                (self.seller().to_owned(), price - self.item.seller_cost),
            ]
            .into_iter()
            .collect(),
            None => zero_rewards(&self.players),
        }
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

    fn finish(&mut self, reason: EndingReason) {
        self.terminal = true;
        self.ending = Some(reason);
        tracing::info!(
            ending = %reason,
            proposals = self.proposals,
            agreement = ?self.agreement,
            "bargain finished"
        );
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

    fn propose(&mut self, player: &str, price: f64, content: String) -> TimeStep {
        self.pool.append(Message::new(player, content, self.turn));
        let price_text = format!("{price:.2}");
        let text = fill_template(
            &self.config.prompts.offer,
            &[("player", player), ("price", price_text.as_str())],
        );
        self.moderator_say(text, Visibility::All);

        if player == self.buyer() {
            self.buyer_offer = Some(price);
        } else {
            self.seller_offer = Some(price);
        }
        self.proposals += 1;
        self.turn += 1;

        if let (Some(bid), Some(ask)) = (self.buyer_offer, self.seller_offer) {
            if bid >= ask {
                let price = (bid + ask) / 2.0;
                self.agreement = Some(price);
                let price_text = format!("{price:.2}");
                let text = fill_template(
                    &self.config.prompts.deal,
                    &[("item", self.item.name.as_str()), ("price", price_text.as_str())],
                );
                self.moderator_say(text, Visibility::All);
                self.finish(EndingReason::Success);
                return self.timestep(self.rewards(Some(price)));
            }
        }

        if self.proposals >= self.config.max_turns {
            let text = self.config.prompts.no_deal.clone();
            self.moderator_say(text, Visibility::All);
            self.finish(EndingReason::RoundLimit);
        }
        self.timestep(zero_rewards(&self.players))
    }
}

impl Environment for Bargain {
    fn name(&self) -> &'static str {
        "bargain"
    }

    fn players(&self) -> &[String] {
        &self.players
    }

    fn reset(&mut self, rng: &mut dyn RngCore) -> TimeStep {
        if let Some(item) = self.config.items.choose(rng) {
            self.item = item.clone();
        }
        self.turn = 0;
        self.proposals = 0;
        self.buyer_offer = None;
        self.seller_offer = None;
        self.agreement = None;
        self.terminal = false;
        self.ending = None;
        self.pool.clear();

        let prompts = self.config.prompts.clone();
        let instructions = offer_format(self.config.format);
        let value = self.item.buyer_value.to_string();
        let cost = self.item.seller_cost.to_string();
        let vars = [
            ("item", self.item.name.as_str()),
            ("value", value.as_str()),
            ("cost", cost.as_str()),
        ];
        let buyer_text = format!("{} {instructions}", fill_template(&prompts.buyer_role, &vars));
        let seller_text = format!("{} {instructions}", fill_template(&prompts.seller_role, &vars));
        let start_text = fill_template(&prompts.game_start, &vars);

        let buyer = Visibility::only(self.buyer());
        let seller = Visibility::only(self.seller());
        self.moderator_say(buyer_text, buyer);
        self.moderator_say(seller_text, seller);
        self.moderator_say(start_text, Visibility::All);
        self.turn = 1;

        tracing::info!(item = %self.item.name, format = %self.config.format, "bargain reset");
        self.timestep(zero_rewards(&self.players))
    }

    fn next_player(&self) -> &str {
        &self.players[(self.proposals % 2) as usize]
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

        let offer = self
            .config
            .format
            .parse(&action.text, OFFER)
            .and_then(|parsed| {
                let price = parse_price(parsed.answer.as_deref().unwrap_or_default())?;
                Ok((price, parsed.content))
            });
        let timestep = match offer {
            Ok((price, content)) => self.propose(player, price, content),
            Err(err) => {
                tracing::debug!(%player, %err, "unparseable offer");
                self.abort(EndingReason::ParseError, &action.text)
            }
        };
        tracing::debug!(%player, turn = self.turn, "bargain step");
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
            Metrics::new(self.turn, self.ending).with_detail("proposals", self.proposals);
        if let Some(price) = self.agreement {
            metrics = metrics.with_detail("agreement", price);
        }
        metrics
    }

    fn disposition(&self) -> Disposition {
        let mut disposition = Disposition {
            secret: self.item.name.clone(),
            players: self.players.len(),
            ..Disposition::default()
        };
        disposition
            .roles
            .insert("buyer".into(), vec![self.buyer().to_owned()]);
        disposition
            .roles
            .insert("seller".into(), vec![self.seller().to_owned()]);
        disposition
            .details
            .insert("buyer_value".into(), self.item.buyer_value.into());
        disposition
            .details
            .insert("seller_cost".into(), self.item.seller_cost.into());
        disposition
    }
}
