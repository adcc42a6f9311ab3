//! # TechScout Core
//!
//! Core library for TechScout. Provides the LLM interface (brain), evidence
//! aggregation over pluggable source providers, the discovery and
//! evaluation pipelines, configuration, and result persistence.

pub mod adapter;
pub mod brain;
pub mod config;
pub mod discovery;
pub mod error;
pub mod evaluation;
pub mod evidence;
pub mod lenient;
pub mod parser;
pub mod persistence;
pub mod providers;
pub mod records;
pub mod retry;
pub mod technology;
pub mod types;

// Re-export commonly used types at the crate root.
pub use adapter::{SourceAdapter, SourceProvider};
pub use brain::{Brain, LlmProvider, MockLlmProvider};
pub use config::{ScoutConfig, load_config};
pub use discovery::{DiscoveryEngine, ScoutingRequest, ScoutingResult};
pub use error::{ConfigError, LlmError, Result, ScoutError, SourceError};
pub use evaluation::{Evaluation, EvaluationBatch, EvaluationEngine, Recommendation};
pub use evidence::EvidenceAggregator;
pub use persistence::OutputDir;
pub use records::{EvidenceBundle, SearchRecord, SourceCategory, SourceCounts, TimeWindow};
pub use retry::RetryPolicy;
pub use technology::{MaturityEstimate, Technology, TrendInsights};
pub use types::{CompletionRequest, CompletionResponse, Message, Role, TokenUsage};
