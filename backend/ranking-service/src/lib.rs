pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod store;
pub mod utils;

pub use config::{Config, RankingLimits};
pub use error::{AppError, DataQualityIssue, FallbackReason};
pub use models::{ContentItem, InteractionRecord, InterestProfile, RankedItem, RankedResult};
pub use services::{ProfileBuilder, RankingPipeline, SortMode, Timeframe};
pub use store::{ContentStore, InMemoryStore, StoreError};
