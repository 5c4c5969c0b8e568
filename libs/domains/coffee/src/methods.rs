use async_trait::async_trait;
use jsonrpc::{MethodDescriptor, MethodRouter, RpcError, StreamSink};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{SearchQuery, TextFilters, TextSearch};
use crate::orchestrator::{BatchSink, SearchOrchestrator};
use crate::params::{ParamReader, ensure_range};
use crate::repository::CoffeeRepository;

pub const SEARCH_PERMISSION: &str = "search";
pub const ROASTERS_READ_PERMISSION: &str = "roasters:read";

pub const SIMILARITY_SEARCH: &str = "similarity_search";
pub const SEARCH_COFFEE_PRODUCTS: &str = "search_coffee_products";
pub const FIND_NEARBY_ROASTERS: &str = "find_nearby_roasters";
pub const GET_ROASTER_DETAILS: &str = "get_roaster_details";

/// Pages deeper than this are rejected rather than scanned.
const MAX_OFFSET: usize = 10_000;

const METHODS: &[MethodDescriptor] = &[
    MethodDescriptor {
        name: SIMILARITY_SEARCH,
        description: "Find coffees matching a flavor profile, degrading from semantic to tag matching",
        permission: SEARCH_PERMISSION,
        supports_streaming: true,
    },
    MethodDescriptor {
        name: SEARCH_COFFEE_PRODUCTS,
        description: "Full-text catalogue search with roast, process, roaster and featured filters",
        permission: SEARCH_PERMISSION,
        supports_streaming: false,
    },
    MethodDescriptor {
        name: FIND_NEARBY_ROASTERS,
        description: "Roasters within a radius of a coordinate, closest first",
        permission: SEARCH_PERMISSION,
        supports_streaming: false,
    },
    MethodDescriptor {
        name: GET_ROASTER_DETAILS,
        description: "Full profile of one roaster",
        permission: ROASTERS_READ_PERMISSION,
        supports_streaming: false,
    },
];

/// A validated coffee method call.
#[derive(Debug, Clone, PartialEq)]
pub enum CoffeeCall {
    Search(SearchQuery),
    RoasterDetails(Uuid),
}

/// Method table for the coffee catalogue.
pub struct CoffeeMethodRouter<R: CoffeeRepository> {
    orchestrator: Arc<SearchOrchestrator<R>>,
}

impl<R: CoffeeRepository> CoffeeMethodRouter<R> {
    pub fn new(orchestrator: Arc<SearchOrchestrator<R>>) -> Self {
        Self { orchestrator }
    }

    fn similarity_search(&self, p: &ParamReader) -> Result<CoffeeCall, RpcError> {
        let config = self.orchestrator.config();
        let tags = p.string_list("flavorProfile")?;
        let max_results = p
            .optional_count("maxResults", 1, config.max_results_cap)?
            .unwrap_or(config.default_max_results);
        let threshold = match p.optional_number("threshold")? {
            Some(t) if t <= 0.0 || t > 1.0 => {
                return Err(RpcError::InvalidParams(
                    "threshold: must be greater than 0 and at most 1".to_string(),
                ));
            }
            other => other,
        };

        Ok(CoffeeCall::Search(SearchQuery::FlavorVector {
            tags,
            max_results,
            threshold,
        }))
    }

    fn search_products(&self, p: &ParamReader) -> Result<CoffeeCall, RpcError> {
        let config = self.orchestrator.config();
        let search = TextSearch {
            text: p.optional_string("query")?,
            filters: TextFilters {
                roast_level: p.optional_string("roastLevel")?,
                process_method: p.optional_string("processMethod")?,
                roaster_id: p.optional_uuid("roasterId")?,
                featured_only: p.optional_bool("featuredOnly")?.unwrap_or(false),
            },
        };
        let max_results = p
            .optional_count("maxResults", 1, config.max_results_cap)?
            .unwrap_or(config.default_max_results);
        let offset = p.optional_count("offset", 0, MAX_OFFSET)?.unwrap_or(0);

        Ok(CoffeeCall::Search(SearchQuery::Text {
            search,
            max_results,
            offset,
        }))
    }

    fn nearby_roasters(&self, p: &ParamReader) -> Result<CoffeeCall, RpcError> {
        let config = self.orchestrator.config();
        let latitude = ensure_range("latitude", p.number("latitude")?, -90.0, 90.0)?;
        let longitude = ensure_range("longitude", p.number("longitude")?, -180.0, 180.0)?;
        let radius_km = match p.optional_number("radiusKm")? {
            Some(r) if r <= 0.0 || r > config.max_radius_km => {
                return Err(RpcError::InvalidParams(format!(
                    "radiusKm: must be greater than 0 and at most {}",
                    config.max_radius_km
                )));
            }
            other => other,
        };
        let max_results = p
            .optional_count("maxResults", 1, config.max_results_cap)?
            .unwrap_or(config.default_max_results);

        Ok(CoffeeCall::Search(SearchQuery::Geo {
            latitude,
            longitude,
            radius_km,
            max_results,
        }))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::Internal(e.to_string()))
}

#[async_trait]
impl<R: CoffeeRepository + 'static> MethodRouter for CoffeeMethodRouter<R> {
    type Call = CoffeeCall;

    fn methods(&self) -> &[MethodDescriptor] {
        METHODS
    }

    fn route(
        &self,
        method: &str,
        params: Option<Map<String, Value>>,
        streaming: bool,
    ) -> Result<CoffeeCall, RpcError> {
        let descriptor = self
            .describe(method)
            .ok_or_else(|| RpcError::MethodNotFound(method.to_string()))?;

        if streaming && !descriptor.supports_streaming {
            return Err(RpcError::StreamingNotSupported(method.to_string()));
        }

        let p = ParamReader::new(params);
        match descriptor.name {
            SIMILARITY_SEARCH => self.similarity_search(&p),
            SEARCH_COFFEE_PRODUCTS => self.search_products(&p),
            FIND_NEARBY_ROASTERS => self.nearby_roasters(&p),
            GET_ROASTER_DETAILS => Ok(CoffeeCall::RoasterDetails(p.uuid("roasterId")?)),
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    async fn invoke(&self, call: CoffeeCall, sink: Option<StreamSink>) -> Result<Value, RpcError> {
        match call {
            CoffeeCall::Search(query) => {
                let batch_sink = sink.as_ref().map(|s| s as &dyn BatchSink);
                let outcome = self.orchestrator.search(query, batch_sink).await?;
                to_json(&outcome)
            }
            CoffeeCall::RoasterDetails(id) => match self.orchestrator.roaster_details(id).await? {
                Some(roaster) => to_json(&roaster),
                None => {
                    debug!(roaster_id = %id, "Roaster not found");
                    Err(RpcError::InvalidParams(format!(
                        "roasterId: no roaster with id {}",
                        id
                    )))
                }
            },
        }
    }
}
