//! Headless runner: plays episodes of one game with built-in bots or
//! scripted actions and prints the outcome.

mod bots;

use arena_bargain::{Bargain, BargainConfig};
use arena_core::{Environment, Message, ResponseFormat, TimeStep};
use arena_host::{Arena, Participant, ScriptedProducer, INVALID_ACTION_RETRY};
use arena_spyfall::{Spyfall, SpyfallConfig};
use arena_word_guess::{WordGuess, WordGuessConfig};
use bots::{BargainBot, SpyfallBot, WordGuessBot};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum GameKind {
    WordGuess,
    Spyfall,
    Bargain,
}

#[derive(Parser, Debug)]
#[command(name = "headless-runner")]
#[command(about = "Run text-game episodes without a backend")]
struct Args {
    /// Game to play
    #[arg(long, value_enum, default_value = "word-guess")]
    game: GameKind,

    /// Comma-separated player names (defaults depend on the game)
    #[arg(long, value_delimiter = ',')]
    players: Vec<String>,

    /// Seed for the arena RNG
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Episodes to play
    #[arg(long, default_value = "1")]
    episodes: u32,

    /// Step budget per episode
    #[arg(long, default_value = "100")]
    max_steps: u32,

    /// Unusable actions tolerated per step
    #[arg(long, default_value_t = INVALID_ACTION_RETRY)]
    retries: u32,

    /// Response format, overriding the config file (json, bracket, sentence, free_text)
    #[arg(long)]
    format: Option<ResponseFormat>,

    /// Game config as JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON object mapping each player to the action texts it plays, in order
    #[arg(long)]
    script: Option<PathBuf>,

    /// Directory for history and chat exports
    #[arg(long)]
    out: Option<PathBuf>,

    /// Print every message of each episode
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    match args.game {
        GameKind::WordGuess => {
            let mut config: WordGuessConfig = load_config(args.config.as_deref())?;
            if let Some(format) = args.format {
                config.format = format;
            }
            let players = roster(&args, &["Paya", "Toto"]);
            let candidates = config.candidates().into_iter().map(str::to_owned).collect::<Vec<_>>();
            let format = config.format;
            let env = WordGuess::new(players.clone(), config, &mut rng)?;
            let participants = seat(&args, &players, env.name(), |_, _| {
                WordGuessBot::new(format, candidates.clone())
            })?;
            play(env, participants, &args)
        }
        GameKind::Spyfall => {
            let mut config: SpyfallConfig = load_config(args.config.as_deref())?;
            if let Some(format) = args.format {
                config.format = format;
            }
            let players = roster(&args, &["Amy", "Jack", "Nancy", "Cindy", "Paul"]);
            let format = config.format;
            let env = Spyfall::new(players.clone(), config, &mut rng)?;
            let participants = seat(&args, &players, env.name(), |idx, _| {
                SpyfallBot::new(format, players.clone(), args.seed.wrapping_add(idx as u64))
            })?;
            play(env, participants, &args)
        }
        GameKind::Bargain => {
            let mut config: BargainConfig = load_config(args.config.as_deref())?;
            if let Some(format) = args.format {
                config.format = format;
            }
            let players = roster(&args, &["Buyer", "Seller"]);
            let format = config.format;
            let env = Bargain::new(players.clone(), config, &mut rng)?;
            let participants = seat(&args, &players, env.name(), |_, _| BargainBot::new(format))?;
            play(env, participants, &args)
        }
    }
}

fn roster(args: &Args, defaults: &[&str]) -> Vec<String> {
    if args.players.is_empty() {
        defaults.iter().map(|p| (*p).to_owned()).collect()
    } else {
        args.players.clone()
    }
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T, Box<dyn Error>> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(T::default()),
    }
}

/// One participant per player: scripted when a script file is given,
/// otherwise whatever `bot` builds.
fn seat<B, F>(
    args: &Args,
    players: &[String],
    game: &str,
    mut bot: F,
) -> Result<Vec<Participant>, Box<dyn Error>>
where
    B: arena_host::ActionProducer + 'static,
    F: FnMut(usize, &str) -> B,
{
    let mut scripts: Option<BTreeMap<String, Vec<String>>> = match &args.script {
        Some(path) => Some(serde_json::from_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };

    players
        .iter()
        .enumerate()
        .map(|(idx, name)| -> Result<Participant, Box<dyn Error>> {
            let role_desc = format!("You are {name}, playing {game}.");
            let participant = match scripts.as_mut() {
                Some(scripts) => {
                    let actions = scripts
                        .remove(name)
                        .ok_or_else(|| format!("script has no actions for {name}"))?;
                    Participant::new(name.as_str(), role_desc, ScriptedProducer::new(actions))
                }
                None => Participant::new(name.as_str(), role_desc, bot(idx, name)),
            };
            Ok(participant)
        })
        .collect()
}

fn play<E: Environment>(
    env: E,
    participants: Vec<Participant>,
    args: &Args,
) -> Result<(), Box<dyn Error>> {
    let mut arena =
        Arena::new(env, participants, args.seed)?.with_invalid_action_retry(args.retries);
    let mut endings: BTreeMap<&'static str, u32> = BTreeMap::new();
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();

    for episode in 0..args.episodes {
        if episode > 0 {
            arena.reset();
        }
        let ts = arena.run(args.max_steps)?;

        if args.verbose {
            print_messages(arena.env().pool().all());
        }
        print_episode(episode, &arena, &ts);

        *endings.entry(arena.metrics().ending.code()).or_insert(0) += 1;
        for (player, reward) in &ts.rewards {
            *totals.entry(player.clone()).or_insert(0.0) += reward;
        }

        if let Some(dir) = &args.out {
            let stem = format!("{}-{}", arena.env().name(), arena.episode());
            arena.save_history(dir.join(format!("{stem}-history.json")))?;
            arena.save_chat(dir.join(format!("{stem}-chat.json")))?;
            tracing::info!(dir = %dir.display(), %stem, "transcript saved");
        }
    }

    print_summary(args.episodes, &endings, &totals);
    Ok(())
}

fn print_messages(messages: &[Message]) {
    for message in messages {
        println!(
            "[{:>3}] {}: {}",
            message.turn(),
            message.author(),
            message.content()
        );
    }
}

fn print_episode<E: Environment>(episode: u32, arena: &Arena<E>, ts: &TimeStep) {
    let metrics = arena.metrics();
    let disposition = arena.env().disposition();

    println!("=== Episode {} ({}) ===", episode + 1, arena.episode());
    println!("Ending: {} after {} turns", metrics.ending, metrics.turns);
    println!("Steps: {}", arena.steps());
    println!("Secret: {}", disposition.secret);
    for (role, holders) in &disposition.roles {
        println!("  {role}: {}", holders.join(", "));
    }
    for (key, value) in &metrics.details {
        println!("  {key}: {value}");
    }
    for (player, reward) in &ts.rewards {
        println!("  reward {player}: {reward}");
    }
}

fn print_summary(
    episodes: u32,
    endings: &BTreeMap<&'static str, u32>,
    totals: &BTreeMap<String, f64>,
) {
    println!();
    println!("=== Summary over {episodes} episode(s) ===");
    for (code, count) in endings {
        println!("  {code}: {count}");
    }
    for (player, total) in totals {
        println!("  total reward {player}: {total}");
    }
}
