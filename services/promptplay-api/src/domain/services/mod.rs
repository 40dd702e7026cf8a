//! 领域服务（LLM 用例）

pub mod extraction;
pub mod matching;

pub use extraction::{ExtractionService, MissingFields, RequiredField};
pub use matching::{GameMatch, MatchingService};
