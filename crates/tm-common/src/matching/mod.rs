pub mod checks;
pub mod ranker;
pub mod scoring;

pub use checks::{CheckOutcome, MatchCriterion, run_all_checks};
pub use ranker::{MatchCandidate, RankerConfig, SuggestionRanker, rank_suggestions};
pub use scoring::{MatchScore, score_match};
