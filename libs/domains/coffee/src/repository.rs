use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::CoffeeResult;
use crate::models::{Coffee, NearbyRoaster, Roaster, TextHit, TextSearch, VectorHit};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Storage collaborator for catalogue queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CoffeeRepository: Send + Sync {
    /// Coffees whose embedding similarity to `embedding` is at least `threshold`,
    /// most similar first.
    async fn nearest_by_vector(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<VectorHit>>;

    /// Candidates sharing at least one flavor tag with `tags` (case-insensitive),
    /// largest overlap first so `limit` never cuts a better match.
    async fn nearest_by_tags(
        &self,
        tags: &[String],
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<Coffee>>;

    async fn search_by_text(
        &self,
        search: &TextSearch,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<TextHit>>;

    /// Roasters within `radius_km` of the point, closest first.
    async fn nearest_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
    ) -> CoffeeResult<Vec<NearbyRoaster>>;

    async fn get_roaster(&self, id: Uuid) -> CoffeeResult<Option<Roaster>>;
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt())
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Clone)]
struct StoredCoffee {
    coffee: Coffee,
    embedding: Option<Vec<f32>>,
}

/// In-memory catalogue for development and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryCoffeeRepository {
    coffees: Arc<RwLock<Vec<StoredCoffee>>>,
    roasters: Arc<RwLock<HashMap<Uuid, Roaster>>>,
}

impl InMemoryCoffeeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_coffee(&self, coffee: Coffee, embedding: Option<Vec<f32>>) {
        self.coffees
            .write()
            .await
            .push(StoredCoffee { coffee, embedding });
    }

    pub async fn insert_roaster(&self, roaster: Roaster) {
        self.roasters.write().await.insert(roaster.id, roaster);
    }
}

#[async_trait]
impl CoffeeRepository for InMemoryCoffeeRepository {
    async fn nearest_by_vector(
        &self,
        embedding: &[f32],
        threshold: f64,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<VectorHit>> {
        let coffees = self.coffees.read().await;
        let mut hits: Vec<VectorHit> = coffees
            .iter()
            .filter_map(|stored| {
                let similarity = cosine_similarity(embedding, stored.embedding.as_deref()?);
                (similarity >= threshold).then(|| VectorHit {
                    coffee: stored.coffee.clone(),
                    similarity,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        Ok(hits.into_iter().skip(offset).take(limit).collect())
    }

    async fn nearest_by_tags(
        &self,
        tags: &[String],
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<Coffee>> {
        let wanted: HashSet<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
        let coffees = self.coffees.read().await;

        let mut ranked: Vec<(usize, &StoredCoffee)> = coffees
            .iter()
            .map(|stored| {
                let own: HashSet<String> = stored
                    .coffee
                    .flavor_tags
                    .iter()
                    .map(|tag| tag.to_lowercase())
                    .collect();
                (own.intersection(&wanted).count(), stored)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|(_, stored)| stored.coffee.clone())
            .collect())
    }

    async fn search_by_text(
        &self,
        search: &TextSearch,
        limit: usize,
        offset: usize,
    ) -> CoffeeResult<Vec<TextHit>> {
        let terms: Vec<String> = search
            .text
            .as_deref()
            .unwrap_or_default()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let filters = &search.filters;
        let coffees = self.coffees.read().await;

        let mut hits: Vec<TextHit> = coffees
            .iter()
            .map(|stored| &stored.coffee)
            .filter(|c| {
                filters
                    .roast_level
                    .as_ref()
                    .is_none_or(|level| c.roast_level.as_ref() == Some(level))
                    && filters
                        .process_method
                        .as_ref()
                        .is_none_or(|method| c.process_method.as_ref() == Some(method))
                    && filters.roaster_id.is_none_or(|id| c.roaster_id == id)
                    && (!filters.featured_only || c.is_featured)
            })
            .filter_map(|c| {
                if terms.is_empty() {
                    return Some(TextHit {
                        coffee: c.clone(),
                        rank: 0.0,
                    });
                }
                let haystack = format!(
                    "{} {} {}",
                    c.name,
                    c.description.as_deref().unwrap_or_default(),
                    c.flavor_tags.join(" ")
                )
                .to_lowercase();
                let matched = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
                (matched > 0).then(|| TextHit {
                    coffee: c.clone(),
                    rank: matched as f64 / terms.len() as f64,
                })
            })
            .collect();

        hits.sort_by(|a, b| b.rank.total_cmp(&a.rank));
        Ok(hits.into_iter().skip(offset).take(limit).collect())
    }

    async fn nearest_by_location(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        limit: usize,
    ) -> CoffeeResult<Vec<NearbyRoaster>> {
        let roasters = self.roasters.read().await;
        let mut nearby: Vec<NearbyRoaster> = roasters
            .values()
            .filter_map(|roaster| {
                let distance_km =
                    haversine_km(latitude, longitude, roaster.latitude?, roaster.longitude?);
                (distance_km <= radius_km).then(|| NearbyRoaster {
                    roaster: roaster.clone(),
                    distance_km,
                })
            })
            .collect();

        nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        nearby.truncate(limit);
        Ok(nearby)
    }

    async fn get_roaster(&self, id: Uuid) -> CoffeeResult<Option<Roaster>> {
        Ok(self.roasters.read().await.get(&id).cloned())
    }
}
