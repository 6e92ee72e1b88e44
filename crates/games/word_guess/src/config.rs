use arena_core::ResponseFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra moderator nudges sent between rounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reminder {
    #[default]
    None,
    /// Repeat the expected answer format to whoever acts next.
    Format,
    /// Remind the speaker of the secret word after every wrong guess.
    SecretWord,
}

/// Moderator texts. `{word}`, `{player}`, `{guess}` and `{terms}` are filled
/// in when a message is emitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WordGuessPrompts {
    pub speaker_role: String,
    pub guesser_role: String,
    pub game_start: String,
    pub secret_word: String,
    pub restricted_words: String,
    pub clue_phase: String,
    pub win: String,
    pub wrong_guess: String,
    pub secret_leaked: String,
    pub word_reminder: String,
}

impl Default for WordGuessPrompts {
    fn default() -> Self {
        Self {
            speaker_role: "You are the speaker! You hold a secret word and must make your partner \
                guess it in as few rounds as possible. Give precise and concise clues. Never say \
                the secret word, never repeat a clue and never use a restricted word."
                .into(),
            guesser_role: "You are the guesser! Use the clues of your partner to guess the secret \
                word. Explain every guess so your partner can give better clues. Never repeat a \
                guess."
                .into(),
            game_start: "Now the game starts!".into(),
            secret_word: "The secret word is: {word}.".into(),
            restricted_words: "The restricted words are: {terms}.".into(),
            clue_phase: "Now the speaker gives one clue, without giving away the secret word."
                .into(),
            win: "{player} guessed the word correctly! The secret word is {word}. You both won!"
                .into(),
            wrong_guess: "{player} guessed {guess}, which is wrong. Now the speaker will give \
                another clue!"
                .into(),
            secret_leaked: "{player} mentioned a forbidden word in the clue. The game is over."
                .into(),
            word_reminder: "Remember, the secret word is {word}.".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WordGuessConfig {
    /// Candidate secret words. When empty, the keys of `taboo` are used.
    pub words: Vec<String>,
    /// Secret word to the terms the speaker may not use.
    pub taboo: BTreeMap<String, Vec<String>>,
    /// End the episode when a clue contains a restricted term.
    pub enforce_taboo: bool,
    pub format: ResponseFormat,
    pub reminder: Reminder,
    pub prompts: WordGuessPrompts,
}

impl WordGuessConfig {
    /// Words a secret is drawn from.
    pub fn candidates(&self) -> Vec<&str> {
        if self.words.is_empty() {
            self.taboo.keys().map(String::as_str).collect()
        } else {
            self.words.iter().map(String::as_str).collect()
        }
    }

    /// Restricted terms of `word`, empty when it has none.
    pub fn restricted(&self, word: &str) -> &[String] {
        self.taboo.get(word).map(Vec::as_slice).unwrap_or_default()
    }
}

impl Default for WordGuessConfig {
    fn default() -> Self {
        let taboo = [
            ("Applesauce", &["fruit", "tree", "glass", "preserving"][..]),
            ("Beef patty", &["pork", "ground", "steak"][..]),
            ("Beef steak", &["meat", "cow", "t-bone", "tenderloin"][..]),
            ("Beer ham", &["sausage", "alcohol"][..]),
        ]
        .into_iter()
        .map(|(word, terms)| {
            (
                word.to_owned(),
                terms.iter().map(|t| (*t).to_owned()).collect(),
            )
        })
        .collect();

        Self {
            words: Vec::new(),
            taboo,
            enforce_taboo: false,
            format: ResponseFormat::Json,
            reminder: Reminder::None,
            prompts: WordGuessPrompts::default(),
        }
    }
}

/// How the speaker has to phrase a clue.
pub fn speaker_format(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => {
            "Answer with a single JSON object: {\"clue\": \"a clue hinting at the secret word\"}"
        }
        ResponseFormat::FreeText | ResponseFormat::Bracket | ResponseFormat::Sentence => {
            "Answer with your clue only."
        }
    }
}

/// How the guesser has to phrase a guess.
pub fn guesser_format(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => {
            "Answer with a single JSON object: {\"guess\": \"a single word\", \"arguments\": \"why you chose it\"}"
        }
        ResponseFormat::Bracket => {
            "Put your guess between square brackets, like [cat], then explain it."
        }
        ResponseFormat::Sentence => {
            "Start with your guess as a short first sentence, then explain it in the next sentences."
        }
        ResponseFormat::FreeText => "Answer with your guess only.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_fall_back_to_taboo_table() {
        let config = WordGuessConfig::default();
        assert_eq!(config.candidates().len(), 4);
        assert_eq!(config.restricted("Beer ham"), ["sausage", "alcohol"]);
        assert!(config.restricted("Ornithorhynchus").is_empty());

        let config = WordGuessConfig {
            words: vec!["Ornithorhynchus".into()],
            ..WordGuessConfig::default()
        };
        assert_eq!(config.candidates(), vec!["Ornithorhynchus"]);
    }
}
