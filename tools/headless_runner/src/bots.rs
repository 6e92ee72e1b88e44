//! Rule-based players for offline runs.
//!
//! They only read what their observation shows them, through a
//! [`HistoryCursor`], the same way a chat backend would.

use arena_bargain::parse_price;
use arena_core::{Action, Message, ResponseFormat, MODERATOR};
use arena_host::{ActionProducer, ActionRequest, HistoryCursor, ProducerError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{json, Map, Value};

/// Phrase an answer and a free-form utterance in `format`.
pub fn render(
    format: ResponseFormat,
    answer: Option<(&str, &str)>,
    content_key: &str,
    content: &str,
) -> String {
    match (format, answer) {
        (ResponseFormat::Json, answer) => {
            let mut object = Map::new();
            if let Some((key, value)) = answer {
                object.insert(key.to_owned(), json!(value));
            }
            object.insert(content_key.to_owned(), json!(content));
            Value::Object(object).to_string()
        }
        (ResponseFormat::Bracket, Some((_, value))) => format!("[{value}] {content}"),
        (ResponseFormat::Sentence, Some((_, value))) => format!("{value}. {content}"),
        (ResponseFormat::FreeText, Some((_, value))) => value.to_owned(),
        (_, None) => content.to_owned(),
    }
}

fn spoken_by_others<'a>(messages: &'a [Message], me: &'a str) -> impl Iterator<Item = &'a Message> {
    messages
        .iter()
        .filter(move |m| m.author() != MODERATOR && m.author() != me)
}

/// Letters of a word, ignoring spaces and punctuation.
fn letters(word: &str) -> Vec<char> {
    word.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Plays either seat of the word guessing game.
///
/// As speaker it spells out hints about the secret word (length, first and
/// last letter); as guesser it tries the candidates those hints allow.
pub struct WordGuessBot {
    format: ResponseFormat,
    candidates: Vec<String>,
    cursor: HistoryCursor,
    secret: Option<String>,
    hints_given: usize,
    clues: Vec<String>,
    tried: Vec<String>,
}

impl WordGuessBot {
    pub fn new(format: ResponseFormat, candidates: Vec<String>) -> Self {
        Self {
            format,
            candidates,
            cursor: HistoryCursor::new(),
            secret: None,
            hints_given: 0,
            clues: Vec::new(),
            tried: Vec::new(),
        }
    }

    fn absorb(&mut self, player: &str, observation: &[Message]) {
        let fresh = self.cursor.unseen(observation);
        for message in fresh {
            if message.author() == MODERATOR && self.secret.is_none() {
                self.secret = secret_from(message.content());
            }
        }
        self.clues.extend(
            spoken_by_others(fresh, player).map(|m| m.content().to_lowercase()),
        );
    }

    fn hint(&mut self, secret: &str) -> String {
        let letters = letters(secret);
        let (first, last) = match (letters.first(), letters.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return "Think of something ordinary.".into(),
        };
        let hint = match self.hints_given % 3 {
            0 => format!("It has {} letters.", letters.len()),
            1 => format!("It starts with '{first}'."),
            _ => format!("It ends with '{last}'."),
        };
        self.hints_given += 1;
        hint
    }

    fn fits(&self, candidate: &str) -> bool {
        let letters = letters(candidate);
        self.clues.iter().all(|clue| {
            if let Some(n) = clue
                .strip_prefix("it has ")
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(|n| n.parse::<usize>().ok())
            {
                return letters.len() == n;
            }
            if let Some(c) = quoted_char(clue, "starts with") {
                return letters.first() == Some(&c);
            }
            if let Some(c) = quoted_char(clue, "ends with") {
                return letters.last() == Some(&c);
            }
            true
        })
    }
}

/// Secret word announced by the default moderator prompt.
fn secret_from(text: &str) -> Option<String> {
    let rest = text.split("The secret word is: ").nth(1)?;
    let word = rest.split('.').next()?.trim();
    (!word.is_empty()).then(|| word.to_owned())
}

fn quoted_char(clue: &str, marker: &str) -> Option<char> {
    let rest = clue.split(marker).nth(1)?;
    let quoted = rest.split('\'').nth(1)?;
    let mut chars = quoted.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

impl ActionProducer for WordGuessBot {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        self.absorb(request.player, request.observation);

        if let Some(secret) = self.secret.clone() {
            let clue = self.hint(&secret);
            return Ok(Action::new(render(self.format, None, "clue", &clue)));
        }

        let guess = self
            .candidates
            .iter()
            .find(|c| !self.tried.contains(c) && self.fits(c))
            .or_else(|| self.candidates.iter().find(|c| !self.tried.contains(c)))
            .cloned()
            .unwrap_or_else(|| "nothing".to_owned());
        self.tried.push(guess.clone());
        let reason = format!("{guess} matches the clues so far");
        Ok(Action::new(render(
            self.format,
            Some(("guess", &guess)),
            "arguments",
            &reason,
        )))
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.secret = None;
        self.hints_given = 0;
        self.clues.clear();
        self.tried.clear();
    }
}

/// Describes vaguely and votes for a random other player.
pub struct SpyfallBot {
    format: ResponseFormat,
    roster: Vec<String>,
    seed: u64,
    rng: StdRng,
    cursor: HistoryCursor,
    voting: bool,
}

impl SpyfallBot {
    pub fn new(format: ResponseFormat, roster: Vec<String>, seed: u64) -> Self {
        Self {
            format,
            roster,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cursor: HistoryCursor::new(),
            voting: false,
        }
    }
}

impl ActionProducer for SpyfallBot {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        // The phase is whatever the moderator announced last.
        if let Some(last) = self
            .cursor
            .unseen(request.observation)
            .iter()
            .rev()
            .find(|m| m.author() == MODERATOR)
        {
            self.voting = last.content().to_lowercase().contains("vot");
        }

        let text = if self.voting {
            let others: Vec<&String> = self
                .roster
                .iter()
                .filter(|name| name.as_str() != request.player)
                .collect();
            let target = others
                .choose(&mut self.rng)
                .map(|name| name.as_str())
                .unwrap_or_default();
            format!("I vote *{target}*, the description sounded off.")
        } else {
            "It is something most people have an opinion about.".to_owned()
        };
        Ok(Action::new(render(self.format, None, "arguments", &text)))
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.rng = StdRng::seed_from_u64(self.seed);
        self.voting = false;
    }
}

/// Concedes a fixed share of its limit every round.
///
/// The limit is the first number in the private role briefing: what the
/// item is worth to a buyer, or what it cost a seller.
pub struct BargainBot {
    format: ResponseFormat,
    cursor: HistoryCursor,
    limit: Option<f64>,
    buyer: bool,
    offers: u32,
}

impl BargainBot {
    pub fn new(format: ResponseFormat) -> Self {
        Self {
            format,
            cursor: HistoryCursor::new(),
            limit: None,
            buyer: true,
            offers: 0,
        }
    }

    fn next_price(&self, limit: f64) -> f64 {
        let step = f64::from(self.offers);
        let price = if self.buyer {
            (limit * (0.5 + 0.1 * step)).min(limit)
        } else {
            (limit * (2.0 - 0.15 * step)).max(limit)
        };
        (price * 100.0).round() / 100.0
    }
}

impl ActionProducer for BargainBot {
    fn act(&mut self, request: &ActionRequest<'_>) -> Result<Action, ProducerError> {
        for message in self.cursor.unseen(request.observation) {
            if message.author() != MODERATOR || self.limit.is_some() {
                continue;
            }
            let content = message.content();
            let buyer = content.contains("You are the buyer");
            if buyer || content.contains("You are the seller") {
                self.buyer = buyer;
                self.limit = parse_price(content).ok();
            }
        }

        let limit = self.limit.unwrap_or(100.0);
        let price = self.next_price(limit);
        self.offers += 1;
        let price_text = price.to_string();
        let reason = if self.buyer {
            "That is as far as my budget goes for now."
        } else {
            "I cannot go lower than this yet."
        };
        Ok(Action::new(render(
            self.format,
            Some(("price", &price_text)),
            "arguments",
            reason,
        )))
    }

    fn reset(&mut self) {
        self.cursor.reset();
        self.limit = None;
        self.buyer = true;
        self.offers = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ask<'a>(player: &'a str, observation: &'a [Message]) -> ActionRequest<'a> {
        ActionRequest {
            player,
            role_desc: "",
            observation,
        }
    }

    #[test]
    fn render_per_format() {
        let answer = Some(("guess", "cat"));
        let json: Value =
            serde_json::from_str(&render(ResponseFormat::Json, answer, "arguments", "meows"))
                .unwrap();
        assert_eq!(json["guess"], "cat");
        assert_eq!(json["arguments"], "meows");
        assert_eq!(
            render(ResponseFormat::Bracket, answer, "arguments", "meows"),
            "[cat] meows"
        );
        assert_eq!(
            render(ResponseFormat::Sentence, answer, "arguments", "meows"),
            "cat. meows"
        );
        assert_eq!(render(ResponseFormat::FreeText, None, "clue", "furry"), "furry");
    }

    #[test]
    fn speaker_never_says_the_word() {
        let mut bot = WordGuessBot::new(ResponseFormat::FreeText, Vec::new());
        let seen = vec![Message::moderator("The secret word is: Banana.", 0)];
        for _ in 0..4 {
            let action = bot.act(&ask("Paya", &seen)).unwrap();
            assert!(!action.text.to_lowercase().contains("banana"));
        }
    }

    #[test]
    fn guesser_narrows_down_with_hints() {
        let words = ["Apple", "Banana", "Cherry"].map(String::from).to_vec();
        let mut bot = WordGuessBot::new(ResponseFormat::FreeText, words);
        let seen = vec![
            Message::new("Paya", "It has 6 letters.", 1),
            Message::new("Paya", "It starts with 'b'.", 1),
        ];
        assert_eq!(bot.act(&ask("Toto", &seen)).unwrap().text, "Banana");
    }

    #[test]
    fn bargain_bot_reads_its_limit() {
        let mut bot = BargainBot::new(ResponseFormat::Bracket);
        let seen = vec![Message::moderator(
            "You are the seller. a kettle cost you 30. Sell it as dearly as possible.",
            0,
        )];
        let first = bot.act(&ask("Seller", &seen)).unwrap();
        assert!(first.text.starts_with("[60]"));
        for _ in 0..20 {
            let offer = bot.act(&ask("Seller", &seen)).unwrap();
            let price = parse_price(&offer.text).unwrap();
            assert!(price >= 30.0);
        }
    }

    #[test]
    fn spyfall_bot_votes_only_when_asked() {
        let roster = ["Amy", "Jack", "Nancy"].map(String::from).to_vec();
        let mut bot = SpyfallBot::new(ResponseFormat::FreeText, roster, 1);
        let mut seen = vec![Message::moderator("Describe your word.", 0)];
        assert!(!bot.act(&ask("Amy", &seen)).unwrap().text.contains('*'));

        seen.push(Message::moderator("Now the voting starts.", 1));
        let vote = bot.act(&ask("Amy", &seen)).unwrap().text;
        assert!(vote.contains("*Jack*") || vote.contains("*Nancy*"));
    }
}
