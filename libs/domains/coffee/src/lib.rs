//! Coffee catalogue search: the multi-tier fallback orchestrator, its storage and
//! embedding collaborators, and the JSON-RPC method table that exposes it.

pub mod config;
pub mod embedding;
pub mod error;
pub mod methods;
pub mod models;
pub mod orchestrator;
pub mod params;
pub mod postgres;
pub mod repository;

pub use config::SearchConfig;
pub use embedding::{EmbeddingProvider, OpenAIConfig, OpenAIProvider};
pub use error::{CoffeeResult, SearchError};
pub use methods::{
    CoffeeCall, CoffeeMethodRouter, ROASTERS_READ_PERMISSION, SEARCH_PERMISSION,
};
pub use models::{
    Coffee, MatchTier, NearbyRoaster, ResultItem, Roaster, SearchOutcome, SearchQuery,
    SearchResult, TextFilters, TextSearch, TierBatch,
};
pub use orchestrator::{BatchSink, SearchOrchestrator};
pub use postgres::PostgresCoffeeRepository;
pub use repository::{CoffeeRepository, InMemoryCoffeeRepository, haversine_km};
