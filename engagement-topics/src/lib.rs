//! C5 — Topic Aggregation Engine: lexical similarity clustering of
//! per-meeting topic records into tenant-scoped canonical Global Topics,
//! relevance scoring, and idempotent work-queue draining (spec §4.5).

pub mod aggregator;
pub mod incoming;
pub mod similarity;

pub use aggregator::{AggregationOutcome, BatchReport, TopicAggregator};
pub use incoming::IncomingTopic;
pub use similarity::{similarity as similarity_score, tokenize};
