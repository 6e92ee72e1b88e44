use arena_core::ResponseFormat;
use serde::{Deserialize, Serialize};

/// Something to trade, with each side's private valuation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    /// Most the buyer is willing to pay.
    pub buyer_value: f64,
    /// Least the seller is willing to accept.
    pub seller_cost: f64,
}

impl Item {
    pub fn new(name: impl Into<String>, buyer_value: f64, seller_cost: f64) -> Self {
        Self {
            name: name.into(),
            buyer_value,
            seller_cost,
        }
    }
}

/// Moderator texts. `{item}`, `{player}`, `{value}`, `{cost}` and `{price}`
/// are filled in when a message is emitted.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BargainPrompts {
    pub game_start: String,
    pub buyer_role: String,
    pub seller_role: String,
    pub offer: String,
    pub deal: String,
    pub no_deal: String,
}

impl Default for BargainPrompts {
    fn default() -> Self {
        Self {
            game_start: "The negotiation over {item} starts now. The buyer makes the first offer."
                .into(),
            buyer_role: "You are the buyer. {item} is worth {value} to you. Buy it as cheaply \
                as possible and never pay more than it is worth."
                .into(),
            seller_role: "You are the seller. {item} cost you {cost}. Sell it as dearly as \
                possible and never sell at a loss."
                .into(),
            offer: "{player} proposes {price}.".into(),
            deal: "Deal! {item} changes hands for {price}.".into(),
            no_deal: "Time is up. No agreement was reached.".into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BargainConfig {
    /// Items an episode draws from.
    pub items: Vec<Item>,
    /// Proposals, counted over both sides, before the talks are called off.
    pub max_turns: u32,
    pub format: ResponseFormat,
    pub prompts: BargainPrompts,
}

impl Default for BargainConfig {
    fn default() -> Self {
        Self {
            items: vec![
                Item::new("a used bicycle", 120.0, 70.0),
                Item::new("a vintage lamp", 60.0, 35.0),
                Item::new("a second-hand laptop", 450.0, 300.0),
            ],
            max_turns: 10,
            format: ResponseFormat::Json,
            prompts: BargainPrompts::default(),
        }
    }
}

/// How a proposal has to be phrased.
pub fn offer_format(format: ResponseFormat) -> &'static str {
    match format {
        ResponseFormat::Json => {
            "Answer with a single JSON object: {\"price\": 42.5, \"arguments\": \"why this price is fair\"}"
        }
        ResponseFormat::Bracket => {
            "Put your price between square brackets, like [42.5], then argue for it."
        }
        ResponseFormat::Sentence => {
            "Start with your price as a short first sentence, then argue for it."
        }
        ResponseFormat::FreeText => "Answer with your price only.",
    }
}
