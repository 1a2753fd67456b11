use clap::{Args, Parser, Subcommand, ValueEnum};
use mimir_core::{ReviewMode, SchedulingPolicy};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[command(name = "mimir", version, about = "Mimir spaced-repetition flashcards")]
pub struct Cli {
    /// Card store file (defaults to the app data dir)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Explicit deck operations
    #[command(subcommand)]
    Deck(DeckCmd),
    /// Card operations
    #[command(subcommand)]
    Card(CardCmd),
    /// Due counts and review statistics
    Stats(StatsCmd),
    /// List tags (implicit decks) with card counts
    Tags,
    /// Run a review session
    Study(StudyCmd),
}

#[derive(Debug, Subcommand, Clone)]
pub enum DeckCmd {
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Rm { deck: String },
}

#[derive(Debug, Subcommand, Clone)]
pub enum CardCmd {
    Add(CardAdd),
    List(CardList),
    Rm { card_id: String },
    Edit(CardEdit),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Interval,
    Mode,
}

impl From<PolicyArg> for SchedulingPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::Interval => SchedulingPolicy::Interval,
            PolicyArg::Mode => SchedulingPolicy::Mode,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    Blitz,
    Learning,
    Retaining,
}

impl From<ModeArg> for ReviewMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Blitz => ReviewMode::Blitz,
            ModeArg::Learning => ReviewMode::Learning,
            ModeArg::Retaining => ReviewMode::Retaining,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CardAdd {
    #[arg(long)]
    pub prompt: String,
    #[arg(long)]
    pub response: String,
    /// Explicit deck (id or name)
    #[arg(long)]
    pub deck: Option<String>,
    /// Comma separated tags
    #[arg(long)]
    pub tags: Option<String>,
    /// Defaults to `mode` for deck cards, `interval` otherwise
    #[arg(long, value_enum)]
    pub policy: Option<PolicyArg>,
}

#[derive(Debug, Args, Clone)]
pub struct CardList {
    /// `all`, `None`, a deck id/name, or a tag
    #[arg(long, default_value = "all")]
    pub scope: String,
    /// Case-insensitive text search over prompt and response
    #[arg(long)]
    pub search: Option<String>,
    /// Only cards due now, soonest first
    #[arg(long)]
    pub due: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CardEdit {
    pub card_id: String,
    #[arg(long)]
    pub prompt: Option<String>,
    #[arg(long)]
    pub response: Option<String>,
    /// Replaces the tag list; pass "" to clear
    #[arg(long)]
    pub tags: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct StatsCmd {
    #[arg(long, default_value = "all")]
    pub scope: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StudyCmd {
    #[arg(long, value_enum, default_value_t = ModeArg::Retaining)]
    pub mode: ModeArg,
    /// `all`, `None`, a deck id/name, or a tag
    #[arg(long, default_value = "all")]
    pub scope: String,
    /// Consecutive correct answers that master a card
    #[arg(long, default_value_t = mimir_core::DEFAULT_MASTERY_THRESHOLD)]
    pub mastery_threshold: u32,
    /// Seconds a learning card waits after a correct answer
    #[arg(long, default_value_t = mimir_core::DEFAULT_LEARNING_REQUEUE_DELAY.as_secs())]
    pub requeue_delay_secs: u64,
    /// Keep store order instead of shuffling
    #[arg(long)]
    pub no_shuffle: bool,
}
