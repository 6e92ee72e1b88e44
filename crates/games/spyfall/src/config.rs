use arena_core::ResponseFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Moderator texts. `{word}` and `{player}` are filled in when a message is
/// emitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyfallPrompts {
    pub game_start: String,
    pub your_word: String,
    pub describe: String,
    pub vote: String,
    pub even_vote: String,
    pub wrong_accusation: String,
    pub correct_accusation: String,
    pub outlier_survived: String,
}

impl Default for SpyfallPrompts {
    fn default() -> Self {
        Self {
            game_start: "Host: The game now starts.".into(),
            your_word: "Your word is: {word}. Remember it for the next rounds and do not say it."
                .into(),
            describe: "Host: Now it's the describing stage, players have to say something about \
                the received word without directly saying it. You cannot repeat what others have \
                said. We will start with {player}. Do not say your word."
                .into(),
            vote: "Host: Now the voting starts. Vote for the player you think is the spy and \
                tell the reason why. Do not say your word."
                .into(),
            even_vote: "There are even votes. The accusation does not stand.".into(),
            wrong_accusation: "The most-voted player is {player}. The accusation is incorrect. \
                {player} leaves the game."
                .into(),
            correct_accusation: "The accusation is correct! {player} is the spy! The villagers \
                won the game."
                .into(),
            outlier_survived: "Too few players are left. {player} was the spy and won the game!"
                .into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SpyfallConfig {
    /// Topic to its word pair: the spy word first, the villager word second.
    pub topic_codes: BTreeMap<String, [String; 2]>,
    /// The spy wins once the active roster shrinks below this size.
    pub min_players: usize,
    pub format: ResponseFormat,
    pub prompts: SpyfallPrompts,
}

impl Default for SpyfallConfig {
    fn default() -> Self {
        let topic_codes = [
            ("Fruits", ["Melon", "Watermelon"]),
            ("Animals", ["Lion", "Tiger"]),
            ("Sports", ["Soccer", "Basketball"]),
        ]
        .into_iter()
        .map(|(topic, [spy, villager])| (topic.to_owned(), [spy.to_owned(), villager.to_owned()]))
        .collect();

        Self {
            topic_codes,
            min_players: 4,
            format: ResponseFormat::Json,
            prompts: SpyfallPrompts::default(),
        }
    }
}

/// How a description has to be phrased.
pub fn describe_format(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => {
            "Answer with a single JSON object: {\"arguments\": \"what you say about your word\"}"
        }
        _ => "Answer with your description only.",
    }
}

/// How a vote has to be phrased.
pub fn vote_format(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => {
            "Answer with a single JSON object: {\"arguments\": \"who you vote for, written as *Name*, and why\"}"
        }
        _ => "Write the name of the player you vote for as *Name*, then explain why.",
    }
}
