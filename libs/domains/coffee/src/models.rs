use serde::Serialize;
use uuid::Uuid;

/// Which stage of the search produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    /// Vector match at the initial threshold
    Primary,
    /// Vector match at a lowered threshold
    Relaxed,
    /// Tag overlap or text match, no embedding involved
    Lexical,
    /// Nothing matched
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coffee {
    pub id: Uuid,
    pub name: String,
    pub roaster_id: Uuid,
    pub roaster_name: Option<String>,
    pub flavor_tags: Vec<String>,
    pub roast_level: Option<String>,
    pub process_method: Option<String>,
    pub price: Option<f64>,
    pub is_featured: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roaster {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_featured: bool,
}

/// Storage row for a vector match; `similarity` is `1 - cosine distance`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub coffee: Coffee,
    pub similarity: f64,
}

/// Storage row for a text match; `rank` is the store's relevance rank (unbounded, ≥ 0).
#[derive(Debug, Clone, PartialEq)]
pub struct TextHit {
    pub coffee: Coffee,
    pub rank: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyRoaster {
    #[serde(flatten)]
    pub roaster: Roaster,
    pub distance_km: f64,
}

/// Product-catalogue filters for text search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextFilters {
    pub roast_level: Option<String>,
    pub process_method: Option<String>,
    pub roaster_id: Option<Uuid>,
    pub featured_only: bool,
}

/// A text search as handed to storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextSearch {
    /// Free-text query; `None` lists by filters alone
    pub text: Option<String>,
    pub filters: TextFilters,
}

/// A validated search request.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    FlavorVector {
        tags: Vec<String>,
        max_results: usize,
        /// Overrides the configured primary threshold
        threshold: Option<f64>,
    },
    Text {
        search: TextSearch,
        max_results: usize,
        offset: usize,
    },
    Geo {
        latitude: f64,
        longitude: f64,
        /// Falls back to the configured default radius
        radius_km: Option<f64>,
        max_results: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ResultItem {
    Coffee(Coffee),
    Roaster(NearbyRoaster),
}

impl ResultItem {
    pub fn id(&self) -> Uuid {
        match self {
            ResultItem::Coffee(coffee) => coffee.id,
            ResultItem::Roaster(nearby) => nearby.roaster.id,
        }
    }
}

/// One ranked result. `score` is always within [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(flatten)]
    pub item: ResultItem,
    pub score: f64,
    pub match_tier: MatchTier,
}

impl SearchResult {
    pub fn id(&self) -> Uuid {
        self.item.id()
    }
}

/// Results produced by one tier, pushed to streaming clients as they arrive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierBatch {
    pub tier: MatchTier,
    pub results: Vec<SearchResult>,
}

/// Final answer of a search.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    /// Best tier that contributed a result; `None` when empty
    pub match_tier: MatchTier,
    pub total: usize,
}

impl SearchOutcome {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            match_tier: MatchTier::None,
            total: 0,
        }
    }
}
