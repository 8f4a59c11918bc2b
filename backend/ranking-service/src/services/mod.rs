pub mod discovery;
pub mod profile_builder;
pub mod ranking;
pub mod recommendation;
pub mod scoring;
pub mod trending;

pub use profile_builder::{ProfileBuilder, SimilaritySignals};
pub use ranking::{Personalization, PersonalizationContext, RankingPipeline, SortMode, Timeframe};
pub use recommendation::RecommendationReason;
pub use trending::TrendingTopic;
