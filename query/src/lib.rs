pub mod matchmaker;
pub mod ranker;

pub use matchmaker::{LookupResult, Matchmaker, MatchmakerConfig};
pub use ranker::{TemporalRanker, DECAY_CONVENTION_HALF_LIFE};
