//! Response formats a participant may be asked to answer in.
//!
//! The format is chosen once, when an environment is built, and then used
//! for every action that environment parses.

use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Longest answer, in words, accepted by [`ResponseFormat::Sentence`].
pub const MAX_SENTENCE_ANSWER_WORDS: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// The whole text is the utterance and, when one is expected, the answer.
    FreeText,
    /// Exactly one JSON object embedded somewhere in the text.
    #[default]
    Json,
    /// The answer is the first `[bracketed]` span, the text is the utterance.
    Bracket,
    /// The answer is the first sentence, the text is the utterance.
    Sentence,
}

/// Which parts of a response the current phase needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Expect {
    /// Key of the short answer (guess, vote, price), if the phase wants one.
    pub answer: Option<&'static str>,
    /// Key of the free-form utterance recorded in the conversation.
    pub content: &'static str,
}

impl Expect {
    pub const fn utterance(content: &'static str) -> Self {
        Self {
            answer: None,
            content,
        }
    }

    pub const fn answer(answer: &'static str, content: &'static str) -> Self {
        Self {
            answer: Some(answer),
            content,
        }
    }
}

/// Structured view of a raw action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedAction {
    pub answer: Option<String>,
    pub content: String,
}

impl ResponseFormat {
    pub fn parse(self, text: &str, expect: Expect) -> Result<ParsedAction, ParseError> {
        match self {
            ResponseFormat::FreeText => parse_free_text(text, expect),
            ResponseFormat::Json => parse_json(text, expect),
            ResponseFormat::Bracket => parse_bracket(text, expect),
            ResponseFormat::Sentence => parse_sentence(text, expect),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResponseFormat::FreeText => "free_text",
            ResponseFormat::Json => "json",
            ResponseFormat::Bracket => "bracket",
            ResponseFormat::Sentence => "sentence",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown response format `{0}`")]
pub struct UnknownFormat(pub String);

impl FromStr for ResponseFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free_text" | "free-text" | "text" => Ok(ResponseFormat::FreeText),
            "json" => Ok(ResponseFormat::Json),
            "bracket" | "bracket_format" | "best" => Ok(ResponseFormat::Bracket),
            "sentence" | "sentence_format" => Ok(ResponseFormat::Sentence),
            other => Err(UnknownFormat(other.to_owned())),
        }
    }
}

fn parse_free_text(text: &str, expect: Expect) -> Result<ParsedAction, ParseError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(ParsedAction {
        answer: expect.answer.map(|_| content.to_owned()),
        content: content.to_owned(),
    })
}

fn parse_json(text: &str, expect: Expect) -> Result<ParsedAction, ParseError> {
    let mut objects = extract_json_objects(text);
    if objects.len() != 1 {
        return Err(ParseError::ObjectCount {
            found: objects.len(),
        });
    }
    let object = objects.remove(0);

    let content = field_text(&object, expect.content)?;
    let answer = match expect.answer {
        Some(key) => Some(field_text(&object, key)?),
        None => None,
    };
    Ok(ParsedAction { answer, content })
}

fn parse_bracket(text: &str, expect: Expect) -> Result<ParsedAction, ParseError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(ParseError::Empty);
    }
    let answer = match expect.answer {
        Some(_) => Some(first_bracketed(content).ok_or(ParseError::MissingBrackets)?),
        None => None,
    };
    Ok(ParsedAction {
        answer,
        content: content.to_owned(),
    })
}

fn parse_sentence(text: &str, expect: Expect) -> Result<ParsedAction, ParseError> {
    let content = text.trim();
    if content.is_empty() {
        return Err(ParseError::Empty);
    }
    let answer = match expect.answer {
        Some(_) => {
            let first = content.split('.').next().unwrap_or_default().trim();
            let words = first.split_whitespace().count();
            if words == 0 {
                return Err(ParseError::Empty);
            }
            if words > MAX_SENTENCE_ANSWER_WORDS {
                return Err(ParseError::AnswerTooLong {
                    words,
                    max: MAX_SENTENCE_ANSWER_WORDS,
                });
            }
            Some(first.to_owned())
        }
        None => None,
    };
    Ok(ParsedAction {
        answer,
        content: content.to_owned(),
    })
}

fn first_bracketed(text: &str) -> Option<String> {
    let start = text.find('[')?;
    let rest = &text[start + 1..];
    let end = rest.find(']')?;
    Some(rest[..end].trim().to_owned())
}

fn field_text(object: &Map<String, Value>, key: &'static str) -> Result<String, ParseError> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        _ => Err(ParseError::MissingField(key)),
    }
}

/// Every top-level JSON object embedded in `text`, in order of appearance.
///
/// Anything between objects (prose, code fences) is skipped.
pub fn extract_json_objects(text: &str) -> Vec<Map<String, Value>> {
    let mut objects = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        let candidate = &rest[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => {
                objects.push(map);
                rest = &candidate[stream.byte_offset()..];
            }
            _ => rest = &candidate[1..],
        }
    }

    objects
}
