use async_trait::async_trait;
use database::{RetryConfig, retry_with_backoff};
use jsonrpc::StreamSink;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::SearchConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{CoffeeResult, SearchError};
use crate::models::{
    Coffee, MatchTier, ResultItem, Roaster, SearchOutcome, SearchQuery, SearchResult, TextSearch,
    TierBatch,
};
use crate::repository::CoffeeRepository;

/// Receives each tier's results while a search is still running.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Returns `false` if the batch could not be delivered.
    async fn push(&self, batch: &TierBatch) -> bool;

    fn is_cancelled(&self) -> bool;
}

#[async_trait]
impl BatchSink for StreamSink {
    async fn push(&self, batch: &TierBatch) -> bool {
        match serde_json::to_value(batch) {
            Ok(value) => self.send_partial(value).await,
            Err(e) => {
                warn!(error = %e, "Failed to encode tier batch");
                false
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        StreamSink::is_cancelled(self)
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) }
}

/// Lower is better.
fn tier_rank(tier: MatchTier) -> u8 {
    match tier {
        MatchTier::Primary => 0,
        MatchTier::Relaxed => 1,
        MatchTier::Lexical => 2,
        MatchTier::None => 3,
    }
}

/// Accumulates results across tiers; the first tier to produce an id keeps it.
#[derive(Default)]
struct Merged {
    results: Vec<SearchResult>,
    seen: HashSet<Uuid>,
}

impl Merged {
    /// Adds the unseen results and returns them.
    fn extend(&mut self, results: Vec<SearchResult>) -> Vec<SearchResult> {
        let fresh: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| self.seen.insert(r.id()))
            .collect();
        self.results.extend(fresh.iter().cloned());
        fresh
    }

    fn len(&self) -> usize {
        self.results.len()
    }

    fn into_outcome(self, max_results: usize) -> SearchOutcome {
        let mut results = self.results;
        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(max_results);

        let match_tier = results
            .iter()
            .map(|r| r.match_tier)
            .min_by_key(|tier| tier_rank(*tier))
            .unwrap_or(MatchTier::None);

        SearchOutcome {
            total: results.len(),
            results,
            match_tier,
        }
    }
}

/// Tier bookkeeping for the all-tiers-failed rule.
#[derive(Default)]
struct Attempts {
    succeeded: usize,
    failed: usize,
}

impl Attempts {
    fn all_failed(&self) -> bool {
        self.failed > 0 && self.succeeded == 0
    }
}

/// Runs searches against the storage and embedding collaborators.
pub struct SearchOrchestrator<R: CoffeeRepository> {
    repository: Arc<R>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    config: SearchConfig,
    retry: RetryConfig,
}

impl<R: CoffeeRepository> SearchOrchestrator<R> {
    pub fn new(
        repository: Arc<R>,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
        config: SearchConfig,
    ) -> Self {
        Self {
            repository,
            embedder,
            config,
            retry: RetryConfig::single_retry(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run `query`. When `sink` is given, each tier's new results are pushed to it
    /// before the final outcome is returned.
    pub async fn search(
        &self,
        query: SearchQuery,
        sink: Option<&dyn BatchSink>,
    ) -> CoffeeResult<SearchOutcome> {
        match query {
            SearchQuery::FlavorVector {
                tags,
                max_results,
                threshold,
            } => {
                let primary = threshold.unwrap_or(self.config.primary_threshold);
                self.flavor_search(&tags, max_results, primary, sink).await
            }
            SearchQuery::Text {
                search,
                max_results,
                offset,
            } => self.text_search(&search, max_results, offset, sink).await,
            SearchQuery::Geo {
                latitude,
                longitude,
                radius_km,
                max_results,
            } => {
                let radius_km = radius_km.unwrap_or(self.config.default_radius_km);
                self.geo_search(latitude, longitude, radius_km, max_results, sink)
                    .await
            }
        }
    }

    #[instrument(skip(self), fields(roaster_id = %id))]
    pub async fn roaster_details(&self, id: Uuid) -> CoffeeResult<Option<Roaster>> {
        self.with_retry(|| self.repository.get_roaster(id)).await
    }

    #[instrument(skip(self, tags, sink), fields(tag_count = tags.len(), threshold = primary))]
    async fn flavor_search(
        &self,
        tags: &[String],
        max_results: usize,
        primary: f64,
        sink: Option<&dyn BatchSink>,
    ) -> CoffeeResult<SearchOutcome> {
        let mut merged = Merged::default();
        let mut attempts = Attempts::default();

        if let Some(embedding) = self.embed_tags(tags, sink).await? {
            let schedule = std::iter::once((primary, MatchTier::Primary)).chain(
                self.config
                    .relaxed_thresholds(primary)
                    .into_iter()
                    .map(|t| (t, MatchTier::Relaxed)),
            );

            for (threshold, tier) in schedule {
                ensure_live(sink)?;
                let hits = self
                    .with_retry(|| {
                        self.repository
                            .nearest_by_vector(&embedding, threshold, max_results, 0)
                    })
                    .await;

                match hits {
                    Ok(hits) => {
                        attempts.succeeded += 1;
                        let results = hits
                            .into_iter()
                            .map(|hit| {
                                self.coffee_result(hit.coffee, hit.similarity, tier)
                            })
                            .collect();
                        let fresh = merged.extend(results);
                        debug!(?tier, threshold, found = fresh.len(), "Vector tier finished");
                        emit(sink, tier, fresh).await?;
                    }
                    Err(e) => {
                        attempts.failed += 1;
                        warn!(?tier, threshold, error = %e, "Vector tier failed, trying next tier");
                    }
                }

                if merged.len() >= self.config.min_results {
                    break;
                }
            }
        }

        if merged.len() < self.config.min_results {
            ensure_live(sink)?;
            match self.lexical_tier(tags).await {
                Ok(results) => {
                    attempts.succeeded += 1;
                    let fresh = merged.extend(results);
                    debug!(found = fresh.len(), "Lexical tier finished");
                    emit(sink, MatchTier::Lexical, fresh).await?;
                }
                Err(e) => {
                    attempts.failed += 1;
                    warn!(error = %e, "Lexical tier failed");
                }
            }
        }

        if attempts.all_failed() {
            return Err(SearchError::Storage(
                "every search tier failed".to_string(),
            ));
        }

        let outcome = merged.into_outcome(max_results);
        info!(match_tier = ?outcome.match_tier, total = outcome.total, "Flavor search complete");
        Ok(outcome)
    }

    /// `None` when no embedding can be used; the caller falls through to lexical matching.
    async fn embed_tags(
        &self,
        tags: &[String],
        sink: Option<&dyn BatchSink>,
    ) -> CoffeeResult<Option<Vec<f32>>> {
        let Some(embedder) = &self.embedder else {
            debug!("No embedding provider configured, using lexical matching");
            return Ok(None);
        };

        ensure_live(sink)?;
        let text = tags.join(", ");
        match self.with_retry(|| embedder.embed(&text)).await {
            Ok(vector) if vector.len() == embedder.dimensions() => Ok(Some(vector)),
            Ok(vector) => {
                warn!(
                    expected = embedder.dimensions(),
                    actual = vector.len(),
                    "Embedding has unexpected dimensions, using lexical matching"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Embedding failed, using lexical matching");
                Ok(None)
            }
        }
    }

    /// Tag-overlap ranking. Storage orders candidates by overlap too, so the
    /// candidate cap only ever cuts weaker matches.
    async fn lexical_tier(&self, tags: &[String]) -> CoffeeResult<Vec<SearchResult>> {
        let wanted: HashSet<String> = tags.iter().map(|t| t.trim().to_lowercase()).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }

        let candidates = self
            .with_retry(|| {
                self.repository
                    .nearest_by_tags(tags, self.config.lexical_candidates, 0)
            })
            .await?;

        let mut ranked: Vec<(usize, Coffee)> = candidates
            .into_iter()
            .map(|coffee| {
                let own: HashSet<String> =
                    coffee.flavor_tags.iter().map(|t| t.to_lowercase()).collect();
                (own.intersection(&wanted).count(), coffee)
            })
            .filter(|(overlap, _)| *overlap > 0)
            .collect();
        ranked.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(ranked
            .into_iter()
            .map(|(overlap, coffee)| {
                let relevance = overlap as f64 / wanted.len() as f64;
                self.coffee_result(coffee, relevance, MatchTier::Lexical)
            })
            .collect())
    }

    #[instrument(skip(self, search, sink), fields(has_text = search.text.is_some()))]
    async fn text_search(
        &self,
        search: &TextSearch,
        max_results: usize,
        offset: usize,
        sink: Option<&dyn BatchSink>,
    ) -> CoffeeResult<SearchOutcome> {
        ensure_live(sink)?;
        let hits = self
            .with_retry(|| self.repository.search_by_text(search, max_results, offset))
            .await?;

        // Store ranks are unbounded; normalize against the best hit of this page.
        let best = hits.iter().map(|h| h.rank).fold(0.0f64, f64::max);
        let results: Vec<SearchResult> = hits
            .into_iter()
            .map(|hit| {
                let relevance = if best > 0.0 { hit.rank / best } else { 0.0 };
                self.coffee_result(hit.coffee, relevance, MatchTier::Lexical)
            })
            .collect();

        let mut merged = Merged::default();
        let fresh = merged.extend(results);
        emit(sink, MatchTier::Lexical, fresh).await?;
        Ok(merged.into_outcome(max_results))
    }

    #[instrument(skip(self, sink))]
    async fn geo_search(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
        max_results: usize,
        sink: Option<&dyn BatchSink>,
    ) -> CoffeeResult<SearchOutcome> {
        ensure_live(sink)?;
        let nearby = self
            .with_retry(|| {
                self.repository
                    .nearest_by_location(latitude, longitude, radius_km, max_results)
            })
            .await?;

        let results: Vec<SearchResult> = nearby
            .into_iter()
            .map(|roaster| SearchResult {
                score: clamp_score(1.0 - roaster.distance_km / radius_km),
                item: ResultItem::Roaster(roaster),
                match_tier: MatchTier::Primary,
            })
            .collect();

        let mut merged = Merged::default();
        let fresh = merged.extend(results);
        emit(sink, MatchTier::Primary, fresh).await?;
        Ok(merged.into_outcome(max_results))
    }

    fn coffee_result(&self, coffee: Coffee, relevance: f64, tier: MatchTier) -> SearchResult {
        let featured = if coffee.is_featured { 1.0 } else { 0.0 };
        let score = self.config.vector_weight * relevance + self.config.featured_weight * featured;
        SearchResult {
            item: ResultItem::Coffee(coffee),
            score: clamp_score(score),
            match_tier: tier,
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: F) -> CoffeeResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = CoffeeResult<T>>,
    {
        retry_with_backoff(operation, self.retry.clone()).await
    }
}

fn ensure_live(sink: Option<&dyn BatchSink>) -> CoffeeResult<()> {
    match sink {
        Some(sink) if sink.is_cancelled() => Err(SearchError::Cancelled),
        _ => Ok(()),
    }
}

async fn emit(
    sink: Option<&dyn BatchSink>,
    tier: MatchTier,
    results: Vec<SearchResult>,
) -> CoffeeResult<()> {
    let Some(sink) = sink else {
        return Ok(());
    };
    if results.is_empty() {
        return Ok(());
    }

    let batch = TierBatch { tier, results };
    if !sink.push(&batch).await && sink.is_cancelled() {
        return Err(SearchError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use crate::models::{NearbyRoaster, TextHit, VectorHit};
    use crate::repository::MockCoffeeRepository;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    fn coffee(name: &str, tags: &[&str], featured: bool) -> Coffee {
        Coffee {
            id: Uuid::new_v4(),
            name: name.to_string(),
            roaster_id: Uuid::nil(),
            roaster_name: None,
            flavor_tags: tags.iter().map(|t| t.to_string()).collect(),
            roast_level: None,
            process_method: None,
            price: None,
            is_featured: featured,
            description: None,
        }
    }

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_dimensions().return_const(3usize);
        mock.expect_embed()
            .returning(|_| Ok(vec![0.1, 0.2, 0.3]));
        Arc::new(mock)
    }

    fn failing_embedder() -> Arc<dyn EmbeddingProvider> {
        let mut mock = MockEmbeddingProvider::new();
        mock.expect_dimensions().return_const(3usize);
        mock.expect_embed()
            .returning(|_| Err(SearchError::Embedding("service unavailable".into())));
        Arc::new(mock)
    }

    fn orchestrator(
        repo: MockCoffeeRepository,
        embedder: Option<Arc<dyn EmbeddingProvider>>,
    ) -> SearchOrchestrator<MockCoffeeRepository> {
        SearchOrchestrator::new(Arc::new(repo), embedder, SearchConfig::default())
            .with_retry_config(
                RetryConfig::single_retry()
                    .with_initial_delay(Duration::ZERO)
                    .with_max_delay(Duration::ZERO),
            )
    }

    fn flavor_query(values: &[&str]) -> SearchQuery {
        SearchQuery::FlavorVector {
            tags: tags(values),
            max_results: 10,
            threshold: None,
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        batches: Mutex<Vec<TierBatch>>,
        cancelled: AtomicBool,
    }

    #[async_trait]
    impl BatchSink for RecordingSink {
        async fn push(&self, batch: &TierBatch) -> bool {
            self.batches.lock().unwrap().push(batch.clone());
            true
        }

        fn is_cancelled(&self) -> bool {
            self.cancelled.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_primary_hits_skip_other_tiers() {
        let strong = coffee("Yirgacheffe", &["floral"], false);
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .times(1)
            .returning(move |_, _, _, _| {
                Ok(vec![VectorHit {
                    coffee: strong.clone(),
                    similarity: 0.9,
                }])
            });
        repo.expect_nearest_by_tags().never();

        let outcome = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["floral"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.match_tier, MatchTier::Primary);
        assert_eq!(outcome.total, 1);
        assert!((outcome.results[0].score - 0.72).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_relaxed_thresholds_strictly_decrease() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .returning(move |_, threshold, _, _| {
                recorder.lock().unwrap().push(threshold);
                Ok(vec![])
            });
        repo.expect_nearest_by_tags().returning(|_, _, _| Ok(vec![]));

        orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["cocoa"]), None)
            .await
            .unwrap();

        let thresholds = seen.lock().unwrap().clone();
        assert_eq!(thresholds.len(), 3);
        assert!(thresholds.windows(2).all(|w| w[1] < w[0]));
        assert!(thresholds.iter().all(|t| *t >= 0.0));
    }

    #[tokio::test]
    async fn test_relaxed_tier_fills_empty_primary() {
        let nearby = coffee("Huila", &["caramel"], false);
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .returning(move |_, threshold, _, _| {
                if threshold < 0.3 {
                    Ok(vec![VectorHit {
                        coffee: nearby.clone(),
                        similarity: 0.25,
                    }])
                } else {
                    Ok(vec![])
                }
            });
        repo.expect_nearest_by_tags().never();

        let outcome = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["caramel"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.match_tier, MatchTier::Relaxed);
        assert_eq!(outcome.results[0].match_tier, MatchTier::Relaxed);
    }

    #[tokio::test]
    async fn test_embedding_failure_falls_back_to_lexical() {
        let both = coffee("Both", &["Chocolate", "Nutty"], false);
        let one = coffee("One", &["chocolate", "berry"], false);
        let none = coffee("None", &["citrus"], false);
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector().never();
        repo.expect_nearest_by_tags()
            .times(1)
            .returning(move |_, _, _| Ok(vec![one.clone(), none.clone(), both.clone()]));

        let outcome = orchestrator(repo, Some(failing_embedder()))
            .search(flavor_query(&["chocolate", "nutty"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.match_tier, MatchTier::Lexical);
        let names: Vec<_> = outcome
            .results
            .iter()
            .map(|r| match &r.item {
                ResultItem::Coffee(c) => c.name.as_str(),
                ResultItem::Roaster(_) => "",
            })
            .collect();
        assert_eq!(names, vec!["Both", "One"]);
        assert!((outcome.results[0].score - 0.8).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_nothing_found_is_empty_not_error() {
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector().returning(|_, _, _, _| Ok(vec![]));
        repo.expect_nearest_by_tags().returning(|_, _, _| Ok(vec![]));

        let outcome = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["smoke"]), None)
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::empty());
    }

    #[tokio::test]
    async fn test_every_tier_failing_is_storage_error() {
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .returning(|_, _, _, _| Err(SearchError::Storage("down".into())));
        repo.expect_nearest_by_tags()
            .returning(|_, _, _| Err(SearchError::Storage("down".into())));

        let err = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["cherry"]), None)
            .await
            .unwrap_err();

        assert!(matches!(err, SearchError::Storage(_)));
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once() {
        let hit = coffee("Gesha", &["jasmine"], true);
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .returning(move |_, _, _, _| {
                let mut n = counter.lock().unwrap();
                *n += 1;
                if *n == 1 {
                    Err(SearchError::Storage("connection reset".into()))
                } else {
                    Ok(vec![VectorHit {
                        coffee: hit.clone(),
                        similarity: 0.95,
                    }])
                }
            });

        let outcome = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["jasmine"]), None)
            .await
            .unwrap();

        assert_eq!(*calls.lock().unwrap(), 2);
        assert_eq!(outcome.match_tier, MatchTier::Primary);
        // 0.8 * 0.95 + 0.2 is clamped into range
        assert!(outcome.results[0].score <= 1.0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_earliest_tier() {
        let shared = coffee("Shared", &["plum"], false);
        let extra = coffee("Extra", &["plum"], false);
        let (a, b) = (shared.clone(), extra.clone());
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector()
            .times(2)
            .returning(move |_, threshold, _, _| {
                let mut hits = vec![VectorHit {
                    coffee: a.clone(),
                    similarity: 0.35,
                }];
                if threshold < 0.3 {
                    hits.push(VectorHit {
                        coffee: b.clone(),
                        similarity: 0.22,
                    });
                }
                Ok(hits)
            });
        repo.expect_nearest_by_tags().never();

        let config = SearchConfig {
            min_results: 2,
            ..SearchConfig::default()
        };
        let orchestrator = SearchOrchestrator::new(Arc::new(repo), Some(embedder()), config)
            .with_retry_config(RetryConfig::single_retry().with_initial_delay(Duration::ZERO));

        let outcome = orchestrator
            .search(flavor_query(&["plum"]), None)
            .await
            .unwrap();

        assert_eq!(outcome.total, 2);
        assert_eq!(outcome.match_tier, MatchTier::Primary);
        assert_eq!(outcome.results[0].id(), shared.id);
        assert_eq!(outcome.results[0].match_tier, MatchTier::Primary);
        assert_eq!(outcome.results[1].id(), extra.id);
        assert_eq!(outcome.results[1].match_tier, MatchTier::Relaxed);
    }

    #[tokio::test]
    async fn test_streaming_pushes_each_tier_batch() {
        let lexical = coffee("Kenya AA", &["blackcurrant"], false);
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector().returning(|_, _, _, _| Ok(vec![]));
        repo.expect_nearest_by_tags()
            .returning(move |_, _, _| Ok(vec![lexical.clone()]));

        let sink = RecordingSink::default();
        let outcome = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["blackcurrant"]), Some(&sink))
            .await
            .unwrap();

        let batches = sink.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].tier, MatchTier::Lexical);
        assert_eq!(outcome.total, 1);
    }

    #[tokio::test]
    async fn test_cancelled_sink_stops_collaborator_calls() {
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector().never();
        repo.expect_nearest_by_tags().never();

        let sink = RecordingSink::default();
        sink.cancelled.store(true, Ordering::SeqCst);

        let err = orchestrator(repo, Some(embedder()))
            .search(flavor_query(&["honey"]), Some(&sink))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[tokio::test]
    async fn test_text_search_normalizes_rank() {
        let top = coffee("Top", &[], false);
        let second = coffee("Second", &[], true);
        let mut repo = MockCoffeeRepository::new();
        repo.expect_search_by_text().returning(move |_, _, _| {
            Ok(vec![
                TextHit {
                    coffee: top.clone(),
                    rank: 0.08,
                },
                TextHit {
                    coffee: second.clone(),
                    rank: 0.02,
                },
            ])
        });

        let outcome = orchestrator(repo, None)
            .search(
                SearchQuery::Text {
                    search: TextSearch {
                        text: Some("ethiopia".into()),
                        ..Default::default()
                    },
                    max_results: 10,
                    offset: 0,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.match_tier, MatchTier::Lexical);
        assert!((outcome.results[0].score - 0.8).abs() < 1e-9);
        assert!((outcome.results[1].score - 0.4).abs() < 1e-9);
        assert!(outcome.results.iter().all(|r| (0.0..=1.0).contains(&r.score)));
    }

    #[tokio::test]
    async fn test_geo_search_uses_default_radius() {
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_location()
            .withf(|_, _, radius, _| (*radius - 50.0).abs() < 1e-9)
            .returning(|_, _, _, _| {
                Ok(vec![NearbyRoaster {
                    roaster: Roaster {
                        id: Uuid::new_v4(),
                        name: "Bonanza".into(),
                        description: None,
                        website: None,
                        city: Some("Berlin".into()),
                        country: None,
                        latitude: Some(52.5),
                        longitude: Some(13.4),
                        is_featured: false,
                    },
                    distance_km: 12.5,
                }])
            });

        let outcome = orchestrator(repo, None)
            .search(
                SearchQuery::Geo {
                    latitude: 52.52,
                    longitude: 13.405,
                    radius_km: None,
                    max_results: 5,
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.match_tier, MatchTier::Primary);
        assert!((outcome.results[0].score - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_no_embedder_goes_straight_to_lexical() {
        let mut repo = MockCoffeeRepository::new();
        repo.expect_nearest_by_vector().never();
        repo.expect_nearest_by_tags().times(1).returning(|_, _, _| Ok(vec![]));

        let outcome = orchestrator(repo, None)
            .search(flavor_query(&["peach"]), None)
            .await
            .unwrap();
        assert_eq!(outcome.match_tier, MatchTier::None);
    }
}
